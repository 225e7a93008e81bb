mod dispatcher;

pub use dispatcher::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The behavior variants a step can be assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Research,
    Builder,
    General,
}

impl AgentKind {
    /// Resolves a stored agent-type tag; unknown tags fall back to `General`
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "research" => AgentKind::Research,
            "builder" => AgentKind::Builder,
            _ => AgentKind::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Research => "research",
            AgentKind::Builder => "builder",
            AgentKind::General => "general",
        }
    }

    /// The variant-specific note written before the shared finalization
    ///
    /// # Returns
    /// * `(key, value)` of the short-term note
    pub fn pre_note(&self, instruction: &str) -> (&'static str, String) {
        match self {
            AgentKind::Research => ("research_note", format!("Reviewed: {}", instruction)),
            AgentKind::Builder => ("build_note", format!("Executing: {}", instruction)),
            AgentKind::General => ("general_note", format!("Handling: {}", instruction)),
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the step an agent is working on
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub task_id: String,
    pub step_id: String,
    pub kind: AgentKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tags_fall_back_to_general() {
        assert_eq!(AgentKind::from_tag("research"), AgentKind::Research);
        assert_eq!(AgentKind::from_tag("builder"), AgentKind::Builder);
        assert_eq!(AgentKind::from_tag("wizard"), AgentKind::General);
        assert_eq!(AgentKind::from_tag(""), AgentKind::General);
    }

    #[test]
    fn pre_notes_per_kind() {
        assert_eq!(
            AgentKind::Research.pre_note("dig"),
            ("research_note", "Reviewed: dig".to_string())
        );
        assert_eq!(
            AgentKind::Builder.pre_note("make"),
            ("build_note", "Executing: make".to_string())
        );
        assert_eq!(
            AgentKind::General.pre_note("do"),
            ("general_note", "Handling: do".to_string())
        );
    }
}

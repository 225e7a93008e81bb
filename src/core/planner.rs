use crate::agents::AgentKind;

const RESEARCH_KEYWORDS: &[&str] = &["research", "analyze", "summarize"];
const BUILDER_KEYWORDS: &[&str] = &["deploy", "implement", "build", "code"];

/// Turns a task description into instructions and assigns each an agent kind
pub trait Planner: std::fmt::Debug + Send + Sync {
    /// Ordered instructions; never empty for a conforming planner
    fn decompose(&self, description: &str) -> Vec<String>;

    fn classify(&self, instruction: &str) -> AgentKind;
}

/// Splits on sentence and line boundaries and classifies by keyword
#[derive(Debug, Default, Clone)]
pub struct KeywordPlanner;

impl Planner for KeywordPlanner {
    fn decompose(&self, description: &str) -> Vec<String> {
        let steps: Vec<String> = description
            .split(['.', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if steps.is_empty() {
            vec![description.trim().to_string()]
        } else {
            steps
        }
    }

    fn classify(&self, instruction: &str) -> AgentKind {
        let lowered = instruction.to_lowercase();
        if RESEARCH_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            AgentKind::Research
        } else if BUILDER_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            AgentKind::Builder
        } else {
            AgentKind::General
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_sentences_and_lines() {
        let planner = KeywordPlanner;
        assert_eq!(
            planner.decompose("Research X. Build Y."),
            vec!["Research X", "Build Y"]
        );
        assert_eq!(
            planner.decompose("first\n\nsecond...third"),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn falls_back_to_trimmed_description() {
        let planner = KeywordPlanner;
        assert_eq!(planner.decompose("  just do it  "), vec!["just do it"]);
        assert_eq!(planner.decompose("..."), vec!["..."]);
        assert_eq!(planner.decompose(""), vec![""]);
    }

    #[test]
    fn classifies_by_keyword() {
        let planner = KeywordPlanner;
        assert_eq!(planner.classify("Summarize the paper"), AgentKind::Research);
        assert_eq!(planner.classify("DEPLOY the service"), AgentKind::Builder);
        // research keywords win over builder ones
        assert_eq!(planner.classify("analyze the build"), AgentKind::Research);
        assert_eq!(planner.classify("say hello"), AgentKind::General);
    }
}

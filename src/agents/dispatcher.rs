use crate::agents::AgentContext;
use crate::constants::{
    CALCULATE_TRIGGER, DEMO_CALCULATOR_EXPRESSION, LAST_INSTRUCTION_KEY, LAST_STATUS_KEY,
    REMEMBER_TRIGGER,
};
use crate::core::TaskStatus;
use crate::db::{Database, ToolCallRepository};
use crate::errors::Error;
use crate::memory::{LongTermMemoryStore, ShortTermMemoryStore};
use crate::tools::ToolRegistry;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Executes one step instruction on behalf of an agent kind
///
/// Every kind writes its own note first, then runs the same finalization.
/// Errors are returned unchanged so the engine can fail the step.
#[derive(Debug, Clone)]
pub struct AgentDispatcher {
    database: Database,
    tools: Arc<ToolRegistry>,
    short_term: ShortTermMemoryStore,
    long_term: Arc<LongTermMemoryStore>,
}

impl AgentDispatcher {
    pub fn new(
        database: Database,
        tools: Arc<ToolRegistry>,
        long_term: Arc<LongTermMemoryStore>,
    ) -> Self {
        Self {
            short_term: ShortTermMemoryStore::new(database.clone()),
            database,
            tools,
            long_term,
        }
    }

    pub fn short_term(&self) -> &ShortTermMemoryStore {
        &self.short_term
    }

    /// Runs `instruction` as the agent described by `context`
    pub async fn execute(&self, context: &AgentContext, instruction: &str) -> Result<(), Error> {
        debug!(
            "Agent {} executing step {} of task {}",
            context.kind, context.step_id, context.task_id
        );
        let (key, note) = context.kind.pre_note(instruction);
        self.short_term.write(&context.task_id, key, &note).await?;
        self.finalize(context, instruction).await
    }

    async fn finalize(&self, context: &AgentContext, instruction: &str) -> Result<(), Error> {
        self.short_term
            .write(&context.task_id, LAST_INSTRUCTION_KEY, instruction)
            .await?;

        let lowered = instruction.to_lowercase();
        if lowered.contains(REMEMBER_TRIGGER) {
            self.long_term
                .add_text(instruction, &json!({ "task_id": context.task_id }))
                .await?;
        }
        if lowered.contains(CALCULATE_TRIGGER) {
            self.call_tool(
                context,
                "calculator",
                json!({ "expression": DEMO_CALCULATOR_EXPRESSION }),
            )
            .await?;
        }

        self.short_term
            .write(&context.task_id, LAST_STATUS_KEY, TaskStatus::Completed.as_str())
            .await
    }

    /// Invokes a registered tool and appends the call to the audit trail
    ///
    /// The audit row is written only after the tool succeeded. If that write
    /// fails the tool has still run; the error is returned as is.
    ///
    /// # Arguments
    /// * `context` - The calling agent
    /// * `name` - Registered tool name
    /// * `arguments` - Arguments object for the tool
    ///
    /// # Returns
    /// * `Result<String, Error>` - The tool's output
    pub async fn call_tool(
        &self,
        context: &AgentContext,
        name: &str,
        arguments: Value,
    ) -> Result<String, Error> {
        self.tools.validate(name)?;
        let output = self.tools.call(name, &arguments)?;

        let task_id = context.task_id.clone();
        let agent = context.kind.as_str();
        let tool = name.to_string();
        let logged = self
            .database
            .run(move |conn| ToolCallRepository::new(conn).insert(&task_id, agent, &tool, &arguments))
            .await;
        if let Err(e) = logged {
            warn!(
                "Tool {} ran for task {} but its call could not be recorded: {}",
                name, context.task_id, e
            );
            return Err(e);
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentKind;
    use crate::db::{test_support::temp_database, TaskRecord, TaskRepository};
    use crate::llm::HashingEmbedder;
    use chrono::Utc;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Database, AgentDispatcher) {
        let (dir, database) = temp_database();
        database
            .run(|conn| {
                let now = Utc::now().to_rfc3339();
                TaskRepository::new(conn).insert_task_with_steps(
                    &TaskRecord {
                        id: "t1".to_string(),
                        owner_id: "u".to_string(),
                        description: "d".to_string(),
                        status: TaskStatus::Running.to_string(),
                        cost: 0.0,
                        metadata: "{}".to_string(),
                        created_at: now.clone(),
                        updated_at: now,
                    },
                    &[],
                )
            })
            .await
            .unwrap();
        let long_term = LongTermMemoryStore::open(
            database.clone(),
            Arc::new(HashingEmbedder::new(16).unwrap()),
            dir.path().join("memory.index"),
        )
        .unwrap();
        let dispatcher = AgentDispatcher::new(
            database.clone(),
            Arc::new(ToolRegistry::with_builtin_tools().unwrap()),
            Arc::new(long_term),
        );
        (dir, database, dispatcher)
    }

    fn context(kind: AgentKind) -> AgentContext {
        AgentContext {
            task_id: "t1".to_string(),
            step_id: "s1".to_string(),
            kind,
        }
    }

    #[tokio::test]
    async fn writes_variant_note_then_shared_notes() {
        let (_dir, _database, dispatcher) = setup().await;
        dispatcher
            .execute(&context(AgentKind::Builder), "Build the thing")
            .await
            .unwrap();

        let notes: Vec<(String, String)> = dispatcher
            .short_term()
            .list("t1")
            .await
            .unwrap()
            .into_iter()
            .map(|n| (n.key, n.value))
            .collect();
        assert_eq!(
            notes,
            vec![
                ("build_note".to_string(), "Executing: Build the thing".to_string()),
                ("last_instruction".to_string(), "Build the thing".to_string()),
                ("last_status".to_string(), "completed".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn remember_and_calculate_have_side_effects() {
        let (_dir, database, dispatcher) = setup().await;
        dispatcher
            .execute(
                &context(AgentKind::General),
                "Please REMEMBER this and Calculate that",
            )
            .await
            .unwrap();

        let calls = database
            .run(|conn| ToolCallRepository::new(conn).list_for_task("t1"))
            .await
            .unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "calculator");
        assert_eq!(calls[0].agent_type, "general");
        assert_eq!(
            calls[0].arguments_json().unwrap(),
            json!({"expression": "1 + 1"})
        );

        let hits = dispatcher
            .long_term
            .search("Please REMEMBER this and Calculate that", 1)
            .await
            .unwrap();
        assert_eq!(hits[0].record.metadata_json().unwrap(), json!({"task_id": "t1"}));
    }

    #[tokio::test]
    async fn unknown_tool_fails_without_logging() {
        let (_dir, database, dispatcher) = setup().await;
        let result = dispatcher
            .call_tool(&context(AgentKind::General), "nonexistent", json!({}))
            .await;
        assert!(matches!(result, Err(Error::UnknownTool(_))));

        let calls = database
            .run(|conn| ToolCallRepository::new(conn).list_for_task("t1"))
            .await
            .unwrap();
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn failed_audit_write_is_propagated() {
        let (_dir, _database, dispatcher) = setup().await;
        let orphan = AgentContext {
            task_id: "missing-task".to_string(),
            step_id: "s".to_string(),
            kind: AgentKind::Research,
        };
        let result = dispatcher
            .call_tool(&orphan, "echo", json!({"text": "hi"}))
            .await;
        assert!(matches!(result, Err(Error::DieselError(_))));
    }
}

use crate::db::models::{NewToolCall, ToolCallRecord};
use crate::errors::Error;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde_json::Value;

/// Append-only access to the `tool_calls` audit trail
pub struct ToolCallRepository<'a> {
    pub conn: &'a mut SqliteConnection,
}

impl<'a> ToolCallRepository<'a> {
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        ToolCallRepository { conn }
    }

    /// Records one tool invocation
    ///
    /// # Arguments
    ///
    /// * `the_task_id` - Task on whose behalf the tool ran
    /// * `agent` - Agent-type tag of the caller
    /// * `tool` - Registered tool name
    /// * `args` - Arguments the tool received
    pub fn insert(
        &mut self,
        the_task_id: &str,
        agent: &str,
        tool: &str,
        args: &Value,
    ) -> Result<(), Error> {
        use crate::schema::tool_calls;
        let now = Utc::now().to_rfc3339();
        let serialized = serde_json::to_string(args)?;

        diesel::insert_into(tool_calls::table)
            .values(&NewToolCall {
                task_id: the_task_id,
                agent_type: agent,
                tool_name: tool,
                arguments: &serialized,
                created_at: &now,
            })
            .execute(self.conn)?;
        Ok(())
    }

    /// All tool calls of a task, oldest first
    pub fn list_for_task(&mut self, the_task_id: &str) -> Result<Vec<ToolCallRecord>, Error> {
        use crate::schema::tool_calls::dsl::*;
        let calls = tool_calls
            .filter(task_id.eq(the_task_id))
            .order_by(id.asc())
            .load::<ToolCallRecord>(self.conn)?;
        Ok(calls)
    }
}

use crate::core::TaskStatus;
use crate::db::models::{StepRecord, TaskRecord};
use crate::errors::Error;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

/// Repository for managing task and step records in the SQLite database
pub struct TaskRepository<'a> {
    /// Database connection
    pub conn: &'a mut SqliteConnection,
}

impl<'a> TaskRepository<'a> {
    /// Creates a new TaskRepository instance
    ///
    /// # Arguments
    ///
    /// * `conn` - Mutable reference to SQLite database connection
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        TaskRepository { conn }
    }

    /// Inserts a task and all of its steps as a single unit
    ///
    /// Either every row becomes visible or none does.
    ///
    /// # Arguments
    ///
    /// * `task` - The task row
    /// * `steps` - The step rows, already carrying `task.id`
    ///
    /// # Errors
    ///
    /// Returns an Error if any insert fails; the transaction is rolled back
    pub fn insert_task_with_steps(
        &mut self,
        task: &TaskRecord,
        steps: &[StepRecord],
    ) -> Result<(), Error> {
        use crate::schema::{task_steps, tasks};

        self.conn.immediate_transaction(|conn| {
            diesel::insert_into(tasks::table)
                .values(task)
                .execute(conn)?;
            if !steps.is_empty() {
                diesel::insert_into(task_steps::table)
                    .values(steps)
                    .execute(conn)?;
            }
            Ok(())
        })
    }

    /// Retrieves a single task by its id
    ///
    /// # Arguments
    ///
    /// * `the_task_id` - The task ID to look up
    ///
    /// # Returns
    ///
    /// The task if found, `None` otherwise
    pub fn get_task(&mut self, the_task_id: &str) -> Result<Option<TaskRecord>, Error> {
        use crate::schema::tasks::dsl::*;
        let found = tasks
            .filter(id.eq(the_task_id))
            .first::<TaskRecord>(self.conn)
            .optional()?;
        Ok(found)
    }

    /// Retrieves the steps of a task ordered by `step_index`
    ///
    /// # Arguments
    ///
    /// * `the_task_id` - The task ID whose steps to load
    pub fn list_steps(&mut self, the_task_id: &str) -> Result<Vec<StepRecord>, Error> {
        use crate::schema::task_steps::dsl::*;
        let steps = task_steps
            .filter(task_id.eq(the_task_id))
            .order_by(step_index.asc())
            .load::<StepRecord>(self.conn)?;
        Ok(steps)
    }

    /// Moves a task from `from` to `to` if it is currently in `from`
    ///
    /// # Arguments
    ///
    /// * `the_task_id` - The task ID to update
    /// * `from` - Status the task must currently have
    /// * `to` - The new status
    ///
    /// # Returns
    ///
    /// `true` if the row was updated, `false` if the task is missing or in another status
    pub fn update_task_status(
        &mut self,
        the_task_id: &str,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<bool, Error> {
        use crate::schema::tasks::dsl::*;
        let now = Utc::now().to_rfc3339();

        let updated = diesel::update(
            tasks
                .filter(id.eq(the_task_id))
                .filter(status.eq(from.as_str())),
        )
        .set((status.eq(to.as_str()), updated_at.eq(&now)))
        .execute(self.conn)?;
        Ok(updated == 1)
    }

    /// Moves a step from `from` to `to` if it is currently in `from`
    ///
    /// # Returns
    ///
    /// `true` if the row was updated
    pub fn update_step_status(
        &mut self,
        step_id: &str,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<bool, Error> {
        use crate::schema::task_steps::dsl::*;

        let updated = diesel::update(
            task_steps
                .filter(id.eq(step_id))
                .filter(status.eq(from.as_str())),
        )
        .set(status.eq(to.as_str()))
        .execute(self.conn)?;
        Ok(updated == 1)
    }

    /// Marks a running step completed and charges `delta` to both the step and its task
    ///
    /// The status change and both cost increments commit together, so the task
    /// cost always equals the sum of its step costs.
    ///
    /// # Arguments
    ///
    /// * `the_task_id` - Owning task
    /// * `step_id` - The step to complete
    /// * `delta` - Cost increment, must be non-negative
    ///
    /// # Returns
    ///
    /// `true` if the step was running and is now completed
    pub fn complete_step(
        &mut self,
        the_task_id: &str,
        step_id: &str,
        delta: f64,
    ) -> Result<bool, Error> {
        use crate::schema::{task_steps, tasks};
        let now = Utc::now().to_rfc3339();

        self.conn.immediate_transaction(|conn| {
            let updated = diesel::update(
                task_steps::table
                    .filter(task_steps::id.eq(step_id))
                    .filter(task_steps::task_id.eq(the_task_id))
                    .filter(task_steps::status.eq(TaskStatus::Running.as_str())),
            )
            .set((
                task_steps::status.eq(TaskStatus::Completed.as_str()),
                task_steps::cost.eq(task_steps::cost + delta),
            ))
            .execute(conn)?;

            if updated != 1 {
                return Ok(false);
            }

            diesel::update(tasks::table.filter(tasks::id.eq(the_task_id)))
                .set((
                    tasks::cost.eq(tasks::cost + delta),
                    tasks::updated_at.eq(&now),
                ))
                .execute(conn)?;
            Ok(true)
        })
    }

    /// Marks a step and its task failed together
    ///
    /// The step may be pending or running; the task must be running.
    /// Other steps are left untouched.
    ///
    /// # Returns
    ///
    /// `true` if the task moved to `failed`
    pub fn fail_step(&mut self, the_task_id: &str, step_id: &str) -> Result<bool, Error> {
        use crate::schema::{task_steps, tasks};
        let now = Utc::now().to_rfc3339();

        self.conn.immediate_transaction(|conn| {
            diesel::update(
                task_steps::table
                    .filter(task_steps::id.eq(step_id))
                    .filter(task_steps::task_id.eq(the_task_id))
                    .filter(task_steps::status.eq_any(vec![
                        TaskStatus::Pending.as_str(),
                        TaskStatus::Running.as_str(),
                    ])),
            )
            .set(task_steps::status.eq(TaskStatus::Failed.as_str()))
            .execute(conn)?;

            let updated = diesel::update(
                tasks::table
                    .filter(tasks::id.eq(the_task_id))
                    .filter(tasks::status.eq(TaskStatus::Running.as_str())),
            )
            .set((
                tasks::status.eq(TaskStatus::Failed.as_str()),
                tasks::updated_at.eq(&now),
            ))
            .execute(conn)?;
            Ok(updated == 1)
        })
    }

    /// Deletes a task; steps, tool calls and short-term notes cascade
    ///
    /// # Returns
    ///
    /// `true` if a task row was removed
    pub fn delete_task(&mut self, the_task_id: &str) -> Result<bool, Error> {
        use crate::schema::tasks::dsl::*;
        let deleted = diesel::delete(tasks.filter(id.eq(the_task_id))).execute(self.conn)?;
        Ok(deleted == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_database;

    fn task_record(task_id: &str) -> TaskRecord {
        let now = Utc::now().to_rfc3339();
        TaskRecord {
            id: task_id.to_string(),
            owner_id: "owner".to_string(),
            description: "Research X. Build Y.".to_string(),
            status: TaskStatus::Pending.to_string(),
            cost: 0.0,
            metadata: "{}".to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn step_record(task_id: &str, index: i32) -> StepRecord {
        StepRecord {
            id: format!("{}-step-{}", task_id, index),
            task_id: task_id.to_string(),
            step_index: index,
            instruction: format!("instruction {}", index),
            agent_type: "general".to_string(),
            status: TaskStatus::Pending.to_string(),
            cost: 0.0,
        }
    }

    #[tokio::test]
    async fn inserts_task_and_steps_together() {
        let (_dir, database) = temp_database();
        let steps = database
            .run(|conn| {
                let mut repo = TaskRepository::new(conn);
                repo.insert_task_with_steps(
                    &task_record("t1"),
                    &[step_record("t1", 1), step_record("t1", 0)],
                )?;
                repo.list_steps("t1")
            })
            .await
            .unwrap();

        let indexes: Vec<i32> = steps.iter().map(|s| s.step_index).collect();
        assert_eq!(indexes, vec![0, 1]);
    }

    #[tokio::test]
    async fn failed_step_insert_leaves_no_task_behind() {
        let (_dir, database) = temp_database();
        let (result, task) = database
            .run(|conn| {
                let mut repo = TaskRepository::new(conn);
                // duplicate (task_id, step_index) violates the unique constraint
                let result = repo.insert_task_with_steps(
                    &task_record("t1"),
                    &[step_record("t1", 0), {
                        let mut dup = step_record("t1", 0);
                        dup.id = "other".to_string();
                        dup
                    }],
                );
                Ok((result.is_err(), repo.get_task("t1")?))
            })
            .await
            .unwrap();

        assert!(result);
        assert!(task.is_none());
    }

    #[tokio::test]
    async fn status_updates_are_compare_and_set() {
        let (_dir, database) = temp_database();
        let (first, second, status) = database
            .run(|conn| {
                let mut repo = TaskRepository::new(conn);
                repo.insert_task_with_steps(&task_record("t1"), &[step_record("t1", 0)])?;
                let first =
                    repo.update_task_status("t1", TaskStatus::Pending, TaskStatus::Running)?;
                let second =
                    repo.update_task_status("t1", TaskStatus::Pending, TaskStatus::Running)?;
                let status = repo.get_task("t1")?.map(|t| t.status);
                Ok((first, second, status))
            })
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(status.as_deref(), Some("running"));
    }

    #[tokio::test]
    async fn complete_step_charges_step_and_task() {
        let (_dir, database) = temp_database();
        let (task, steps) = database
            .run(|conn| {
                let mut repo = TaskRepository::new(conn);
                repo.insert_task_with_steps(
                    &task_record("t1"),
                    &[step_record("t1", 0), step_record("t1", 1)],
                )?;
                for step in ["t1-step-0", "t1-step-1"] {
                    repo.update_step_status(step, TaskStatus::Pending, TaskStatus::Running)?;
                    assert!(repo.complete_step("t1", step, 0.25)?);
                }
                // a completed step cannot be charged twice
                assert!(!repo.complete_step("t1", "t1-step-0", 0.25)?);
                Ok((repo.get_task("t1")?, repo.list_steps("t1")?))
            })
            .await
            .unwrap();

        let task = task.unwrap();
        let step_sum: f64 = steps.iter().map(|s| s.cost).sum();
        assert_eq!(task.cost, 0.5);
        assert_eq!(task.cost, step_sum);
        assert!(steps.iter().all(|s| s.status == "completed"));
    }

    #[tokio::test]
    async fn fail_step_fails_step_and_task_only() {
        let (_dir, database) = temp_database();
        let (failed, task, steps) = database
            .run(|conn| {
                let mut repo = TaskRepository::new(conn);
                repo.insert_task_with_steps(
                    &task_record("t1"),
                    &[step_record("t1", 0), step_record("t1", 1)],
                )?;
                repo.update_task_status("t1", TaskStatus::Pending, TaskStatus::Running)?;
                repo.update_step_status("t1-step-0", TaskStatus::Pending, TaskStatus::Running)?;
                let failed = repo.fail_step("t1", "t1-step-0")?;
                Ok((failed, repo.get_task("t1")?, repo.list_steps("t1")?))
            })
            .await
            .unwrap();

        assert!(failed);
        assert_eq!(task.unwrap().status, "failed");
        let statuses: Vec<&str> = steps.iter().map(|s| s.status.as_str()).collect();
        assert_eq!(statuses, vec!["failed", "pending"]);
    }

    #[tokio::test]
    async fn delete_task_cascades_to_steps() {
        let (_dir, database) = temp_database();
        let (deleted, steps) = database
            .run(|conn| {
                let mut repo = TaskRepository::new(conn);
                repo.insert_task_with_steps(&task_record("t1"), &[step_record("t1", 0)])?;
                let deleted = repo.delete_task("t1")?;
                Ok((deleted, repo.list_steps("t1")?))
            })
            .await
            .unwrap();

        assert!(deleted);
        assert!(steps.is_empty());
    }
}

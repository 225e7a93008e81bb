use super::TaskExecutionEngine;
use crate::agents::{AgentContext, AgentKind};
use crate::core::TaskStatus;
use crate::db::{StepRecord, TaskRepository};
use crate::errors::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

fn invalid_transition(entity: &'static str, id: &str, from: &str, to: TaskStatus) -> Error {
    Error::InvalidTransition {
        entity,
        id: id.to_string(),
        from: from.to_string(),
        to: to.to_string(),
    }
}

impl TaskExecutionEngine {
    /// Starts `run` on the runtime and returns without waiting for it
    ///
    /// The spawned job logs its own outcome; awaiting the handle is optional.
    pub fn schedule_run(&self, task_id: &str) -> JoinHandle<Result<TaskStatus, Error>> {
        let engine = self.clone();
        let task_id = task_id.to_string();
        debug!("Scheduling run of task {}", task_id);

        tokio::spawn(async move {
            let outcome = engine.run(&task_id).await;
            match &outcome {
                Ok(status) => info!("Task {} finished as {}", task_id, status),
                Err(e) => error!("Task {} could not be run: {}", task_id, e),
            }
            outcome
        })
    }

    /// Executes the steps of a pending task strictly in order
    ///
    /// A failing step marks itself and the task `failed`; later steps are not
    /// started and stay `pending`. Step failures are reported through the
    /// returned status, not as an error.
    ///
    /// # Returns
    ///
    /// * `Ok(TaskStatus::Completed)` or `Ok(TaskStatus::Failed)`
    ///
    /// # Errors
    ///
    /// * `NotFound` if the task does not exist
    /// * `InvalidTransition` if the task is not pending
    /// * Persistence errors while recording the outcome; the task is then
    ///   moved from `running` to `failed` on a best-effort basis
    pub async fn run(&self, task_id: &str) -> Result<TaskStatus, Error> {
        let steps = self.start_task(task_id).await?;
        info!("Running task {} ({} step(s))", task_id, steps.len());

        for step in &steps {
            if let Err(e) = self.execute_step(task_id, step).await {
                warn!(
                    "Step {} ({}) of task {} failed: {}",
                    step.step_index, step.id, task_id, e
                );
                if let Err(e) = self.fail_task(task_id, &step.id).await {
                    error!("Could not record failure of task {}: {}", task_id, e);
                    self.abandon_task(task_id).await;
                    return Err(e);
                }
                return Ok(TaskStatus::Failed);
            }
        }

        if let Err(e) = self
            .transition_task(task_id, TaskStatus::Running, TaskStatus::Completed)
            .await
        {
            error!("Could not record completion of task {}: {}", task_id, e);
            self.abandon_task(task_id).await;
            return Err(e);
        }
        Ok(TaskStatus::Completed)
    }

    /// Last-resort `running -> failed` write once recording the outcome failed
    async fn abandon_task(&self, task_id: &str) {
        let id = task_id.to_string();
        let outcome = self
            .database
            .run(move |conn| {
                TaskRepository::new(conn).update_task_status(
                    &id,
                    TaskStatus::Running,
                    TaskStatus::Failed,
                )
            })
            .await;
        match outcome {
            Ok(true) => warn!("Task {} marked failed", task_id),
            Ok(false) => debug!("Task {} already left running", task_id),
            Err(e) => error!("Task {} left running: {}", task_id, e),
        }
    }

    async fn start_task(&self, task_id: &str) -> Result<Vec<StepRecord>, Error> {
        let id = task_id.to_string();
        self.database
            .run(move |conn| {
                let mut repo = TaskRepository::new(conn);
                let task = repo
                    .get_task(&id)?
                    .ok_or_else(|| Error::not_found("task", id.clone()))?;
                let from = task.status.parse::<TaskStatus>().map_err(Error::InvalidArgument)?;
                if !from.can_transition_to(TaskStatus::Running)
                    || !repo.update_task_status(&id, TaskStatus::Pending, TaskStatus::Running)?
                {
                    return Err(invalid_transition("task", &id, &task.status, TaskStatus::Running));
                }
                repo.list_steps(&id)
            })
            .await
    }

    async fn execute_step(&self, task_id: &str, step: &StepRecord) -> Result<(), Error> {
        let step_id = step.id.clone();
        self.database
            .run(move |conn| {
                if TaskRepository::new(conn).update_step_status(
                    &step_id,
                    TaskStatus::Pending,
                    TaskStatus::Running,
                )? {
                    Ok(())
                } else {
                    Err(invalid_transition("step", &step_id, "non-pending", TaskStatus::Running))
                }
            })
            .await?;

        let context = AgentContext {
            task_id: task_id.to_string(),
            step_id: step.id.clone(),
            kind: AgentKind::from_tag(&step.agent_type),
        };
        self.dispatcher.execute(&context, &step.instruction).await?;

        let (task, step_id, cost) = (task_id.to_string(), step.id.clone(), self.step_cost);
        let completed = self
            .database
            .run(move |conn| TaskRepository::new(conn).complete_step(&task, &step_id, cost))
            .await?;
        if !completed {
            return Err(invalid_transition(
                "step",
                &step.id,
                "non-running",
                TaskStatus::Completed,
            ));
        }
        debug!("Step {} of task {} completed", step.step_index, task_id);
        Ok(())
    }

    async fn fail_task(&self, task_id: &str, step_id: &str) -> Result<(), Error> {
        let (task, step) = (task_id.to_string(), step_id.to_string());
        let failed = self
            .database
            .run(move |conn| TaskRepository::new(conn).fail_step(&task, &step))
            .await?;
        if !failed {
            return Err(invalid_transition(
                "task",
                task_id,
                "non-running",
                TaskStatus::Failed,
            ));
        }
        Ok(())
    }

    async fn transition_task(
        &self,
        task_id: &str,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<(), Error> {
        if !from.can_transition_to(to) {
            return Err(invalid_transition("task", task_id, from.as_str(), to));
        }
        let id = task_id.to_string();
        let updated = self
            .database
            .run(move |conn| TaskRepository::new(conn).update_task_status(&id, from, to))
            .await?;
        if !updated {
            return Err(invalid_transition("task", task_id, from.as_str(), to));
        }
        Ok(())
    }
}

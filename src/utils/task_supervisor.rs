use tokio::task::JoinHandle;
use std::collections::HashMap;
use crate::error::{Error, Result};
use tracing::{error, info};

/// Owns the process's background tasks (the limit order scheduler) so they
/// can be health-checked and torn down with the process.
pub struct TaskSupervisor {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        TaskSupervisor {
            tasks: HashMap::new(),
        }
    }

    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> &mut Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(future);

        info!(task = %name, "Spawned background task");
        if let Some(previous) = self.tasks.insert(name, handle) {
            previous.abort();
        }
        self
    }

    /// Errors if any task finished on its own. Finished tasks are dropped
    /// from tracking.
    pub fn check_health(&mut self) -> Result<()> {
        let finished: Vec<String> = self.tasks.iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();

        if finished.is_empty() {
            return Ok(());
        }

        for name in &finished {
            self.tasks.remove(name);
        }
        let message = format!("tasks terminated unexpectedly: {:?}", finished);
        error!("{}", message);
        Err(Error::TaskFailed(message))
    }

    pub fn active_task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for a task that was told to stop (e.g. through a shutdown channel).
    pub async fn wait_for_task(&mut self, name: &str) -> Result<()> {
        let handle = self.tasks.remove(name)
            .ok_or_else(|| Error::TaskFailed(format!("task {} not found", name)))?;

        handle.await
            .map_err(|e| Error::TaskFailed(format!("task {} failed: {}", name, e)))?;
        info!(task = %name, "Task completed");
        Ok(())
    }

    pub fn shutdown_all(&mut self) {
        info!("Aborting {} background tasks", self.tasks.len());
        for (name, handle) in self.tasks.drain() {
            handle.abort();
            info!(task = %name, "Aborted task");
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

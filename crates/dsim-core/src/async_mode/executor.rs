use std::rc::Rc;

use super::channel::Receiver;
use super::task::{Task, TaskId};

// Polls tasks woken up since the previous step.
// Tasks schedule themselves by pushing to the channel, so the polling order is the wake-up order.
pub(crate) struct Executor {
    scheduled_tasks: Receiver<Rc<Task>>,
}

impl Executor {
    pub fn new(scheduled_tasks: Receiver<Rc<Task>>) -> Self {
        Self { scheduled_tasks }
    }

    pub fn has_scheduled_tasks(&self) -> bool {
        !self.scheduled_tasks.is_empty()
    }

    // Drops scheduled tasks without polling them.
    pub fn clear(&self) {
        while let Some(task) = self.scheduled_tasks.try_recv() {
            drop(task);
        }
    }

    // Polls one scheduled task, if any.
    // Returns the task id and whether the task has completed.
    pub fn process_task(&self) -> Option<(TaskId, bool)> {
        let task = self.scheduled_tasks.try_recv()?;
        let id = task.id();
        let completed = task.poll();
        Some((id, completed))
    }
}

use std::cell::RefCell;
use std::rc::Rc;
use std::task::Context;

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use super::channel::Sender;
use super::waker::{task_waker, RcWake};

pub(crate) type TaskId = u64;

// Asynchronous task spawned for an actor.
// Holds the actor future and reschedules itself for polling when woken up.
pub(crate) struct Task {
    id: TaskId,
    future: RefCell<Option<LocalBoxFuture<'static, ()>>>,
    executor: Sender<Rc<Task>>,
}

impl Task {
    pub fn spawn(id: TaskId, future: impl std::future::Future<Output = ()> + 'static, executor: Sender<Rc<Task>>) {
        let task = Rc::new(Task {
            id,
            future: RefCell::new(Some(future.boxed_local())),
            executor,
        });
        task.schedule();
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    // Polls the inner future, returns true if it has completed.
    // A wake-up of an already completed task is ignored.
    pub fn poll(self: Rc<Self>) -> bool {
        let mut slot = self.future.borrow_mut();
        let Some(mut future) = slot.take() else {
            return false;
        };
        let waker = task_waker(&self);
        let mut async_ctx = Context::from_waker(&waker);
        if future.as_mut().poll(&mut async_ctx).is_pending() {
            *slot = Some(future);
            false
        } else {
            true
        }
    }

    fn schedule(self: &Rc<Self>) {
        self.executor.send(self.clone());
    }
}

impl RcWake for Task {
    fn wake_by_ref(rc_self: &Rc<Self>) {
        rc_self.schedule();
    }
}

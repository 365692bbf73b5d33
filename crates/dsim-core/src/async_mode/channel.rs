// Unbounded single-threaded queue connecting woken tasks with the executor.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub(crate) struct Receiver<T> {
    queue: Rc<RefCell<VecDeque<T>>>,
}

impl<T> Receiver<T> {
    pub fn try_recv(&self) -> Option<T> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

pub(crate) struct Sender<T> {
    queue: Rc<RefCell<VecDeque<T>>>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<T> Sender<T> {
    pub fn send(&self, value: T) {
        self.queue.borrow_mut().push_back(value);
    }
}

pub(crate) fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let queue = Rc::new(RefCell::new(VecDeque::new()));
    (Sender { queue: queue.clone() }, Receiver { queue })
}

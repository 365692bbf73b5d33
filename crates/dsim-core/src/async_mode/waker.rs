// Waker over Rc, since tasks are not Send and std::task::Wake requires Arc.

use std::mem::ManuallyDrop;
use std::rc::Rc;
use std::task::{RawWaker, RawWakerVTable, Waker};

pub(crate) trait RcWake: 'static {
    fn wake_by_ref(rc_self: &Rc<Self>);
}

// Creates an owned waker holding one strong reference to the task.
pub(crate) fn task_waker<W: RcWake>(task: &Rc<W>) -> Waker {
    let ptr = Rc::into_raw(task.clone()).cast::<()>();
    unsafe { Waker::from_raw(RawWaker::new(ptr, vtable::<W>())) }
}

fn vtable<W: RcWake>() -> &'static RawWakerVTable {
    &RawWakerVTable::new(clone_raw::<W>, wake_raw::<W>, wake_by_ref_raw::<W>, drop_raw::<W>)
}

unsafe fn clone_raw<W: RcWake>(ptr: *const ()) -> RawWaker {
    unsafe { Rc::increment_strong_count(ptr.cast::<W>()) };
    RawWaker::new(ptr, vtable::<W>())
}

unsafe fn wake_raw<W: RcWake>(ptr: *const ()) {
    let rc = unsafe { Rc::from_raw(ptr.cast::<W>()) };
    W::wake_by_ref(&rc);
}

unsafe fn wake_by_ref_raw<W: RcWake>(ptr: *const ()) {
    let rc = ManuallyDrop::new(unsafe { Rc::from_raw(ptr.cast::<W>()) });
    W::wake_by_ref(&rc);
}

unsafe fn drop_raw<W: RcWake>(ptr: *const ()) {
    drop(unsafe { Rc::from_raw(ptr.cast::<W>()) });
}

//! Named point-to-point channels between actors.
//!
//! A mailbox keeps a FIFO queue of messages sent before a receiver arrived and at most one waiting receiver.
//! Each message is delivered after the transfer time on the route between the sender and receiver locations.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use serde::Serialize;
use sugars::{rc, refcell};

use dsim_core::{log_trace, Id, Simulation, SimulationContext};

use crate::Network;

/// Message transferred through a mailbox.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Message {
    /// Message payload.
    pub payload: f64,
    /// Message size in bytes.
    pub size: f64,
}

impl Message {
    /// Creates a new message.
    pub fn new(payload: f64, size: f64) -> Self {
        Self { payload, size }
    }
}

/// Event delivering a message to the receiver waiting on a mailbox.
///
/// The event key of this event is the mailbox id.
#[derive(Clone, Serialize)]
pub struct MessageDelivered {
    /// Mailbox id.
    pub mailbox: u64,
    /// Delivered message.
    pub message: Message,
}

/// Event notifying a synchronous sender that its message has reached the receiver.
///
/// The event key of this event is the transfer id.
#[derive(Clone, Serialize)]
pub struct TransferCompleted {
    /// Transfer id.
    pub transfer: u64,
}

struct Envelope {
    message: Message,
    sender: Id,
    // set for synchronous sends awaiting completion
    transfer: Option<u64>,
}

#[derive(Default)]
struct MailboxState {
    queue: VecDeque<Envelope>,
    waiting: Option<Id>,
}

/// Named mailbox, see [`Mailboxes`].
pub struct Mailbox {
    id: u64,
    name: String,
    state: RefCell<MailboxState>,
    network: Rc<RefCell<Network>>,
    transfer_counter: Rc<Cell<u64>>,
}

impl Mailbox {
    /// Returns the mailbox id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the mailbox name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of queued messages.
    pub fn len(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Returns `true` if there are no queued messages.
    pub fn is_empty(&self) -> bool {
        self.state.borrow().queue.is_empty()
    }

    /// Returns `true` if some receiver waits for a message.
    pub fn has_waiting_receiver(&self) -> bool {
        self.state.borrow().waiting.is_some()
    }

    fn transfer_time(&self, src: Id, dst: Id, size: f64) -> f64 {
        self.network.borrow().transfer_time(src, dst, size)
    }

    fn deliver(&self, ctx: &SimulationContext, receiver: Id, message: Message) -> f64 {
        let delay = self.transfer_time(ctx.id(), receiver, message.size);
        log_trace!(
            ctx,
            "message {:?} to {} delivered in {:.6}",
            message,
            self.name,
            delay
        );
        ctx.emit(
            MessageDelivered {
                mailbox: self.id,
                message,
            },
            receiver,
            delay,
        );
        delay
    }

    /// Sends the message without waiting for its delivery.
    ///
    /// If a receiver is waiting, the message is delivered to it after the transfer time,
    /// otherwise the message is queued.
    pub fn send(&self, ctx: &SimulationContext, message: Message) {
        let waiting = self.state.borrow_mut().waiting.take();
        match waiting {
            Some(receiver) => {
                self.deliver(ctx, receiver, message);
            }
            None => self.state.borrow_mut().queue.push_back(Envelope {
                message,
                sender: ctx.id(),
                transfer: None,
            }),
        }
    }

    /// Sends the message and waits until it reaches the receiver.
    ///
    /// If no receiver is waiting, the sender stays suspended until the message is dequeued
    /// by a receiver and transferred to it.
    pub async fn put(&self, ctx: &SimulationContext, message: Message) {
        let waiting = self.state.borrow_mut().waiting.take();
        match waiting {
            Some(receiver) => {
                let delay = self.deliver(ctx, receiver, message);
                ctx.sleep(delay).await;
            }
            None => {
                let transfer = self.transfer_counter.get();
                self.transfer_counter.set(transfer + 1);
                let completion = ctx.recv_event_by_key::<TransferCompleted>(transfer);
                self.state.borrow_mut().queue.push_back(Envelope {
                    message,
                    sender: ctx.id(),
                    transfer: Some(transfer),
                });
                completion.await;
            }
        }
    }

    /// Receives the oldest message, waiting for a sender if the mailbox is empty.
    ///
    /// Panics if another receiver is already waiting on this mailbox.
    pub async fn get(&self, ctx: &SimulationContext) -> Message {
        let envelope = self.state.borrow_mut().queue.pop_front();
        match envelope {
            Some(envelope) => {
                let delay = self.transfer_time(envelope.sender, ctx.id(), envelope.message.size);
                if let Some(transfer) = envelope.transfer {
                    ctx.emit(TransferCompleted { transfer }, envelope.sender, delay);
                }
                ctx.sleep(delay).await;
                envelope.message
            }
            None => {
                {
                    let mut state = self.state.borrow_mut();
                    if let Some(receiver) = state.waiting {
                        panic!(
                            "Mailbox {} already has a waiting receiver {}, `{}` cannot receive concurrently",
                            self.name,
                            ctx.lookup_name(receiver),
                            ctx.name()
                        );
                    }
                    state.waiting = Some(ctx.id());
                }
                let event = ctx.recv_event_by_key::<MessageDelivered>(self.id).await;
                event.data.message
            }
        }
    }
}

/// Registry of mailboxes identified by name.
pub struct Mailboxes {
    network: Rc<RefCell<Network>>,
    mailboxes: HashMap<String, Rc<Mailbox>>,
    transfer_counter: Rc<Cell<u64>>,
}

impl Mailboxes {
    /// Creates an empty registry for the given simulation and network.
    pub fn new(sim: &Simulation, network: Rc<RefCell<Network>>) -> Self {
        sim.register_key_getter_for::<MessageDelivered>(|event: &MessageDelivered| event.mailbox);
        sim.register_key_getter_for::<TransferCompleted>(|event: &TransferCompleted| event.transfer);
        Self {
            network,
            mailboxes: HashMap::new(),
            transfer_counter: rc!(Cell::new(0)),
        }
    }

    /// Returns the mailbox with the given name, creating it on first use.
    pub fn by_name_or_create(&mut self, name: &str) -> Rc<Mailbox> {
        let next_id = self.mailboxes.len() as u64;
        self.mailboxes
            .entry(name.to_string())
            .or_insert_with(|| {
                rc!(Mailbox {
                    id: next_id,
                    name: name.to_string(),
                    state: refcell!(MailboxState::default()),
                    network: self.network.clone(),
                    transfer_counter: self.transfer_counter.clone(),
                })
            })
            .clone()
    }

    /// Returns the mailbox with the given name if it exists.
    pub fn get(&self, name: &str) -> Option<Rc<Mailbox>> {
        self.mailboxes.get(name).cloned()
    }
}

//! Bounded mailbox shared between threads.
//!
//! A multi-sender queue built on `critical-section` and `heapless::Deque`.
//! The sending half can be registered with the hub as a [`Sink`]; the
//! receiving half is drained by the transport layer. Dropping the receiver
//! closes the mailbox so further sends fail with
//! [`DeliveryError::Disconnected`].

use core::cell::RefCell;
use std::sync::Arc;

use critical_section::Mutex;
use heapless::Deque;

use crate::error::DeliveryError;
use crate::event::Event;
use crate::hub::Sink;

/// Error returned when trying to send to a full or closed mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrySendError<T> {
    Full(T),
    Closed(T),
}

/// Error returned when trying to receive from an empty mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryReceiveError;

struct Slots<T, const SIZE: usize> {
    queue: Deque<T, SIZE>,
    closed: bool,
}

struct Shared<T, const SIZE: usize> {
    inner: Mutex<RefCell<Slots<T, SIZE>>>,
}

/// Create a mailbox with room for `SIZE` values.
pub fn mailbox<T, const SIZE: usize>() -> (MailboxSender<T, SIZE>, MailboxReceiver<T, SIZE>) {
    let shared = Arc::new(Shared {
        inner: Mutex::new(RefCell::new(Slots {
            queue: Deque::new(),
            closed: false,
        })),
    });
    (
        MailboxSender {
            shared: Arc::clone(&shared),
        },
        MailboxReceiver { shared },
    )
}

/// Sending half of a mailbox.
///
/// Multiple senders can coexist; they share the same queue.
pub struct MailboxSender<T, const SIZE: usize> {
    shared: Arc<Shared<T, SIZE>>,
}

impl<T, const SIZE: usize> Clone for MailboxSender<T, SIZE> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, const SIZE: usize> MailboxSender<T, SIZE> {
    /// Try to queue a value without blocking.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        critical_section::with(|cs| {
            let mut slots = self.shared.inner.borrow(cs).borrow_mut();
            if slots.closed {
                return Err(TrySendError::Closed(value));
            }
            slots.queue.push_back(value).map_err(TrySendError::Full)
        })
    }

    pub fn is_closed(&self) -> bool {
        critical_section::with(|cs| self.shared.inner.borrow(cs).borrow().closed)
    }
}

impl<const SIZE: usize> Sink for MailboxSender<Event, SIZE> {
    fn deliver(&mut self, event: &Event, _payload: &str) -> Result<(), DeliveryError> {
        self.try_send(event.clone()).map_err(|err| match err {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Disconnected,
        })
    }

    fn never_blocks(&self) -> bool {
        true
    }
}

impl<const SIZE: usize> Sink for MailboxSender<String, SIZE> {
    fn deliver(&mut self, _event: &Event, payload: &str) -> Result<(), DeliveryError> {
        self.try_send(payload.to_owned()).map_err(|err| match err {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Disconnected,
        })
    }

    fn never_blocks(&self) -> bool {
        true
    }
}

/// Receiving half of a mailbox.
pub struct MailboxReceiver<T, const SIZE: usize> {
    shared: Arc<Shared<T, SIZE>>,
}

impl<T, const SIZE: usize> MailboxReceiver<T, SIZE> {
    /// Try to take the oldest queued value.
    pub fn try_receive(&self) -> Result<T, TryReceiveError> {
        critical_section::with(|cs| {
            let mut slots = self.shared.inner.borrow(cs).borrow_mut();
            slots.queue.pop_front().ok_or(TryReceiveError)
        })
    }

    /// Take every queued value, oldest first.
    pub fn drain(&self) -> Vec<T> {
        critical_section::with(|cs| {
            let mut slots = self.shared.inner.borrow(cs).borrow_mut();
            let mut values = Vec::with_capacity(slots.queue.len());
            while let Some(value) = slots.queue.pop_front() {
                values.push(value);
            }
            values
        })
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.shared.inner.borrow(cs).borrow().queue.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, const SIZE: usize> Drop for MailboxReceiver<T, SIZE> {
    fn drop(&mut self) {
        critical_section::with(|cs| {
            self.shared.inner.borrow(cs).borrow_mut().closed = true;
        });
    }
}

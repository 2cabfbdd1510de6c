//! Message passing between workers.
//!
//! Workers exchange typed, ordered buffers tagged by an integer conversation id. A receive
//! names its source and tag and blocks until a matching message arrives; a send never blocks.
//! Two messages with the same source and tag are received in the order they were sent.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace};

use crate::error::{Error, Result};

/// Primitive element type of a buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Double,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "int"),
            DataType::Double => write!(f, "double"),
        }
    }
}

/// A buffer in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Int(Vec<i64>),
    Double(Vec<f64>),
}

impl Payload {
    pub fn data_type(&self) -> DataType {
        match self {
            Payload::Int(_) => DataType::Int,
            Payload::Double(_) => DataType::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Int(v) => v.len(),
            Payload::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Element types that can be sent.
pub trait Element: Copy {
    const TYPE: DataType;

    fn wrap(data: &[Self]) -> Payload;

    /// Copies the payload into `buffer`. The caller has checked type and length.
    fn unwrap_into(payload: Payload, buffer: &mut [Self]);
}

impl Element for i64 {
    const TYPE: DataType = DataType::Int;

    fn wrap(data: &[i64]) -> Payload {
        Payload::Int(data.to_vec())
    }

    fn unwrap_into(payload: Payload, buffer: &mut [i64]) {
        if let Payload::Int(v) = payload {
            buffer.copy_from_slice(&v);
        }
    }
}

impl Element for f64 {
    const TYPE: DataType = DataType::Double;

    fn wrap(data: &[f64]) -> Payload {
        Payload::Double(data.to_vec())
    }

    fn unwrap_into(payload: Payload, buffer: &mut [f64]) {
        if let Payload::Double(v) = payload {
            buffer.copy_from_slice(&v);
        }
    }
}

/// Point-to-point transport within a fixed group of workers.
pub trait Comm {
    /// Index of this worker in the group.
    fn rank(&self) -> usize;

    /// Number of workers in the group.
    fn size(&self) -> usize;

    /// Blocks until a message with `tag` from `source` arrives and copies it into `buffer`.
    ///
    /// The message must carry exactly `buffer.len()` elements of type `T`. Fails with
    /// [`Error::Disconnected`] once `source` has left the group and nothing it sent is left.
    fn receive<T: Element>(&self, buffer: &mut [T], source: usize, tag: i32) -> Result<()>;

    /// Queues `data` for `destination` and returns immediately.
    fn send<T: Element>(&self, data: &[T], destination: usize, tag: i32) -> Result<()>;
}

#[derive(Debug)]
struct Message {
    from: usize,
    tag: i32,
    payload: Payload,
}

/// In-process transport for a group of worker threads.
///
/// Each worker owns one endpoint; endpoints are `Send`, so they can be moved into threads.
/// Messages that arrive while a receive is waiting for a different source or tag are kept
/// aside until asked for.
///
/// Dropping an endpoint marks its rank as gone. A receive blocked on that rank then drains
/// whatever the rank sent before leaving and fails with [`Error::Disconnected`].
pub struct ChannelComm {
    rank: usize,
    senders: Vec<Sender<Message>>,
    receiver: Receiver<Message>,
    pending: RefCell<VecDeque<Message>>,
    alive: Arc<Vec<AtomicBool>>,
}

/// How long a blocked receive waits before checking whether its source is still alive.
const LIVENESS_POLL: Duration = Duration::from_millis(10);

impl ChannelComm {
    /// Creates `size` connected endpoints; endpoint `i` has rank `i`.
    pub fn group(size: usize) -> Vec<ChannelComm> {
        assert!(size > 0, "Group needs at least one worker");
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| channel()).unzip();
        let alive: Arc<Vec<AtomicBool>> = Arc::new((0..size).map(|_| AtomicBool::new(true)).collect());
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, receiver)| ChannelComm {
                rank,
                senders: senders.clone(),
                receiver,
                pending: RefCell::new(VecDeque::new()),
                alive: alive.clone(),
            })
            .collect()
    }

    fn check_worker(&self, worker: usize) -> Result<()> {
        if worker >= self.senders.len() {
            return Err(Error::UnknownWorker {
                worker,
                size: self.senders.len(),
            });
        }
        Ok(())
    }

    fn next_matching(&self, source: usize, tag: i32) -> Result<Message> {
        {
            let mut pending = self.pending.borrow_mut();
            if let Some(pos) = pending.iter().position(|m| m.from == source && m.tag == tag) {
                if let Some(message) = pending.remove(pos) {
                    return Ok(message);
                }
            }
        }
        loop {
            // Every endpoint keeps a sender to its own queue, so the channel itself never
            // reports a dead peer. Liveness comes from the shared flags instead.
            match self.receiver.recv_timeout(LIVENESS_POLL) {
                Ok(message) => {
                    if let Some(message) = self.accept(message, source, tag) {
                        return Ok(message);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.alive[source].load(Ordering::Acquire) {
                        continue;
                    }
                    // Sends happen before the flag is cleared, so they are all queued by now.
                    while let Ok(message) = self.receiver.try_recv() {
                        if let Some(message) = self.accept(message, source, tag) {
                            return Ok(message);
                        }
                    }
                    debug!("worker {}: worker {} left the group", self.rank, source);
                    return Err(Error::Disconnected(source));
                }
                Err(RecvTimeoutError::Disconnected) => return Err(Error::Disconnected(source)),
            }
        }
    }

    /// Returns the message if it matches, otherwise sets it aside.
    fn accept(&self, message: Message, source: usize, tag: i32) -> Option<Message> {
        if message.from == source && message.tag == tag {
            return Some(message);
        }
        trace!(
            "worker {}: setting aside message from {} with tag {}",
            self.rank,
            message.from,
            message.tag
        );
        self.pending.borrow_mut().push_back(message);
        None
    }
}

impl Drop for ChannelComm {
    fn drop(&mut self) {
        self.alive[self.rank].store(false, Ordering::Release);
    }
}

impl Comm for ChannelComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.senders.len()
    }

    fn receive<T: Element>(&self, buffer: &mut [T], source: usize, tag: i32) -> Result<()> {
        self.check_worker(source)?;
        let message = self.next_matching(source, tag)?;
        let found = message.payload.data_type();
        if found != T::TYPE {
            return Err(Error::TypeMismatch {
                from: source,
                tag,
                expected: T::TYPE,
                found,
            });
        }
        if message.payload.len() != buffer.len() {
            return Err(Error::CountMismatch {
                from: source,
                tag,
                expected: buffer.len(),
                found: message.payload.len(),
            });
        }
        T::unwrap_into(message.payload, buffer);
        Ok(())
    }

    fn send<T: Element>(&self, data: &[T], destination: usize, tag: i32) -> Result<()> {
        self.check_worker(destination)?;
        let message = Message {
            from: self.rank,
            tag,
            payload: T::wrap(data),
        };
        self.senders[destination]
            .send(message)
            .map_err(|_| Error::Disconnected(destination))
    }
}

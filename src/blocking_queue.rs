use std::collections::VecDeque;
use std::error;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::queue_stat::QueueStats;

/// Returned by [`BoundedBlockingQueue::put`] once the queue is closed.
///
/// Carries the rejected item back to the producer.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct PutError<T>(pub T);

/// Returned by [`BoundedBlockingQueue::take`] once the queue is closed and
/// every buffered item has been handed out.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TakeError;

#[derive(PartialEq, Eq, Clone, Copy)]
pub enum TryPutError<T> {
    WouldBlock(T),
    Closed(T),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryTakeError {
    WouldBlock,
    Closed,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CapacityError;

impl<T> PutError<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> TryPutError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TryPutError::WouldBlock(t) | TryPutError::Closed(t) => t,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TryPutError::Closed(_))
    }
}

impl TryTakeError {
    pub fn is_closed(&self) -> bool {
        *self == TryTakeError::Closed
    }
}

// Items are often not `Debug`; keep them out of the formatted error.
impl<T> fmt::Debug for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PutError(..)")
    }
}

impl<T> fmt::Debug for TryPutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryPutError::WouldBlock(..) => f.write_str("WouldBlock(..)"),
            TryPutError::Closed(..) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("putting on a closed queue")
    }
}

impl fmt::Display for TakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("taking from a closed and empty queue")
    }
}

impl<T> fmt::Display for TryPutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryPutError::WouldBlock(..) => f.write_str("timed out putting on a full queue"),
            TryPutError::Closed(..) => f.write_str("putting on a closed queue"),
        }
    }
}

impl fmt::Display for TryTakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryTakeError::WouldBlock => f.write_str("timed out taking from an empty queue"),
            TryTakeError::Closed => f.write_str("taking from a closed and empty queue"),
        }
    }
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue capacity must be greater than zero")
    }
}

impl<T> error::Error for PutError<T> {}
impl error::Error for TakeError {}
impl<T> error::Error for TryPutError<T> {}
impl error::Error for TryTakeError {}
impl error::Error for CapacityError {}

impl<T> From<PutError<T>> for TryPutError<T> {
    fn from(err: PutError<T>) -> TryPutError<T> {
        TryPutError::Closed(err.0)
    }
}

impl From<TakeError> for TryTakeError {
    fn from(_: TakeError) -> TryTakeError {
        TryTakeError::Closed
    }
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
    stat: QueueStats,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

/// A fixed-capacity FIFO queue shared between producer and consumer threads.
///
/// `put` blocks while the queue is full and `take` blocks while it is empty.
/// Cloning the queue yields another handle to the same buffer. After
/// [`close`](BoundedBlockingQueue::close) producers are rejected, while
/// consumers keep receiving buffered items until the queue runs dry.
///
/// ```
/// use muduo_queue::BoundedBlockingQueue;
/// use std::thread;
///
/// let queue = BoundedBlockingQueue::new(2);
/// let producer = queue.clone();
/// let handle = thread::spawn(move || {
///     for i in 0..5 {
///         producer.put(i).unwrap();
///     }
///     producer.close();
/// });
///
/// let mut got = Vec::new();
/// while let Ok(i) = queue.take() {
///     got.push(i);
/// }
/// handle.join().unwrap();
/// assert_eq!(got, vec![0, 1, 2, 3, 4]);
/// ```
pub struct BoundedBlockingQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for BoundedBlockingQueue<T> {
    fn clone(&self) -> Self {
        BoundedBlockingQueue {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for BoundedBlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("BoundedBlockingQueue")
            .field("capacity", &self.inner.capacity)
            .field("size", &state.items.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl<T> BoundedBlockingQueue<T> {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        match Self::try_new(capacity) {
            Ok(queue) => queue,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_new(capacity: usize) -> Result<Self, CapacityError> {
        if capacity == 0 {
            return Err(CapacityError);
        }
        Ok(BoundedBlockingQueue {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    items: VecDeque::with_capacity(capacity),
                    closed: false,
                    stat: QueueStats::new(capacity),
                }),
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
                capacity,
            }),
        })
    }

    pub fn put(&self, item: T) -> Result<(), PutError<T>> {
        let mut state = self.lock();
        if state.items.len() == self.inner.capacity && !state.closed {
            trace!("put blocked on full queue");
            state.stat.blocked_puts += 1;
        }
        while state.items.len() == self.inner.capacity && !state.closed {
            state = self.inner.not_full.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        if state.closed {
            state.stat.rejected_puts += 1;
            return Err(PutError(item));
        }
        self.push(state, item);
        Ok(())
    }

    pub fn take(&self) -> Result<T, TakeError> {
        let mut state = self.lock();
        if state.items.is_empty() && !state.closed {
            trace!("take blocked on empty queue");
            state.stat.blocked_takes += 1;
        }
        while state.items.is_empty() && !state.closed {
            state = self.inner.not_empty.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        self.pop(state).ok_or(TakeError)
    }

    /// Like [`put`](BoundedBlockingQueue::put), but gives up after `timeout`.
    ///
    /// A zero timeout never waits.
    pub fn try_put(&self, item: T, timeout: Duration) -> Result<(), TryPutError<T>> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        let mut blocked = false;
        while state.items.len() == self.inner.capacity && !state.closed {
            let remaining = match remaining(deadline) {
                Some(remaining) => remaining,
                None => {
                    trace!(?timeout, "put timed out on full queue");
                    state.stat.put_timeouts += 1;
                    return Err(TryPutError::WouldBlock(item));
                }
            };
            if !blocked {
                blocked = true;
                state.stat.blocked_puts += 1;
            }
            state = self
                .inner
                .not_full
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        if state.closed {
            state.stat.rejected_puts += 1;
            return Err(TryPutError::Closed(item));
        }
        self.push(state, item);
        Ok(())
    }

    /// Like [`take`](BoundedBlockingQueue::take), but gives up after `timeout`.
    ///
    /// A zero timeout never waits.
    pub fn try_take(&self, timeout: Duration) -> Result<T, TryTakeError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        let mut blocked = false;
        while state.items.is_empty() && !state.closed {
            let remaining = match remaining(deadline) {
                Some(remaining) => remaining,
                None => {
                    trace!(?timeout, "take timed out on empty queue");
                    state.stat.take_timeouts += 1;
                    return Err(TryTakeError::WouldBlock);
                }
            };
            if !blocked {
                blocked = true;
                state.stat.blocked_takes += 1;
            }
            state = self
                .inner
                .not_empty
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        self.pop(state).ok_or(TryTakeError::Closed)
    }

    /// Closes the queue and wakes every waiting producer and consumer.
    ///
    /// Returns `true` for the call that closed it; later calls do nothing.
    pub fn close(&self) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.closed = true;
        debug!(buffered = state.items.len(), "queue closed");
        drop(state);
        self.inner.not_full.notify_all();
        self.inner.not_empty.notify_all();
        true
    }

    pub fn size(&self) -> usize {
        self.lock().items.len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().items.len() == self.inner.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        let mut stat = state.stat.clone();
        stat.size = state.items.len();
        stat.closed = state.closed;
        stat
    }

    // No user code runs under this lock, so a poisoned state is still whole.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, mut state: MutexGuard<'_, State<T>>, item: T) {
        debug_assert!(state.items.len() < self.inner.capacity);
        state.items.push_back(item);
        let size = state.items.len();
        state.stat.record_put(size);
        drop(state);
        self.inner.not_empty.notify_one();
    }

    fn pop(&self, mut state: MutexGuard<'_, State<T>>) -> Option<T> {
        let front = state.items.pop_front()?;
        state.stat.record_take();
        drop(state);
        self.inner.not_full.notify_one();
        Some(front)
    }
}

// `None` once the deadline has passed; an unrepresentable deadline waits forever.
fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    match deadline {
        Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
                None
            } else {
                Some(deadline - now)
            }
        }
        None => Some(Duration::from_secs(u64::MAX)),
    }
}

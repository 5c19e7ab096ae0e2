pub mod blocking_queue;
pub use blocking_queue::{
    BoundedBlockingQueue, CapacityError, PutError, TakeError, TryPutError, TryTakeError,
};

pub mod countdown_latch;
pub use countdown_latch::CountdownLatch;

pub mod queue_stat;
pub use queue_stat::QueueStats;

/// Error returned by the pipeline binary and other application code.
///
/// The queue's own errors are small, typed values since `Closed` and
/// `WouldBlock` are hit during normal execution. They all implement
/// `std::error::Error`, so they convert into this boxed form with `?`.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for application code built on the queue.
pub type Result<T> = std::result::Result<T, Error>;

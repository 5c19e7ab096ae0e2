use chrono::{DateTime, Utc};

/// Counters kept by a [`BoundedBlockingQueue`](crate::BoundedBlockingQueue)
/// under its own lock.
///
/// A `QueueStats` value is a snapshot: it is copied out while the lock is
/// held, so all fields agree with each other, but it may be stale as soon as
/// it is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    pub started_at: DateTime<Utc>,
    pub capacity: usize,
    pub size: usize,
    pub closed: bool,
    pub total_puts: u64,
    pub total_takes: u64,
    pub rejected_puts: u64,
    pub put_timeouts: u64,
    pub take_timeouts: u64,
    pub blocked_puts: u64,
    pub blocked_takes: u64,
    pub high_watermark: usize,
}

impl QueueStats {
    pub(crate) fn new(capacity: usize) -> QueueStats {
        QueueStats {
            started_at: Utc::now(),
            capacity,
            size: 0,
            closed: false,
            total_puts: 0,
            total_takes: 0,
            rejected_puts: 0,
            put_timeouts: 0,
            take_timeouts: 0,
            blocked_puts: 0,
            blocked_takes: 0,
            high_watermark: 0,
        }
    }

    pub(crate) fn record_put(&mut self, size: usize) {
        self.total_puts += 1;
        if size > self.high_watermark {
            self.high_watermark = size;
        }
    }

    pub(crate) fn record_take(&mut self) {
        self.total_takes += 1;
    }

    pub fn in_flight(&self) -> u64 {
        self.total_puts - self.total_takes
    }

    pub fn report(&self) -> String {
        let mut res = String::new();
        res.push_str(&format!("start_time {}\n", self.started_at.to_rfc3339()));
        res.push_str(&format!(
            "capacity {}\nsize {}\nclosed {}\n",
            self.capacity, self.size, self.closed
        ));
        res.push_str(&format!(
            "total_puts {}\ntotal_takes {}\nrejected_puts {}\n",
            self.total_puts, self.total_takes, self.rejected_puts
        ));
        res.push_str(&format!(
            "put_timeouts {}\ntake_timeouts {}\n",
            self.put_timeouts, self.take_timeouts
        ));
        res.push_str(&format!(
            "blocked_puts {}\nblocked_takes {}\n",
            self.blocked_puts, self.blocked_takes
        ));
        res.push_str(&format!("high_watermark {}\n", self.high_watermark));
        res
    }
}

use std::time::Duration;

/// Lines of history requested per pod
pub const DEFAULT_TAIL_LINES: i64 = 10;

/// Delay between readiness polls
pub const DEFAULT_READY_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Readiness polls before giving up (30 x 10s = 5 minutes)
pub const DEFAULT_READY_MAX_ATTEMPTS: u32 = 30;

/// Capacity of the queue shared by all workers
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// How long shutdown waits for tasks to unwind
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Immutable settings for a [`LogStreamer`](crate::LogStreamer)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    /// Existing lines to replay before following
    pub tail_lines: i64,

    /// Delay between readiness polls for a newly discovered pod
    pub ready_poll_interval: Duration,

    /// Readiness polls before a pod is skipped
    pub ready_max_attempts: u32,

    /// Bounded capacity of the line queue; full queues block producers
    pub queue_capacity: usize,

    /// Upper bound on waiting for tasks after cancellation
    pub shutdown_grace: Duration,
}

impl StreamConfig {
    pub fn with_tail_lines(mut self, tail_lines: i64) -> Self {
        self.tail_lines = tail_lines;
        self
    }

    pub fn with_ready_poll_interval(mut self, interval: Duration) -> Self {
        self.ready_poll_interval = interval;
        self
    }

    pub fn with_ready_max_attempts(mut self, attempts: u32) -> Self {
        self.ready_max_attempts = attempts;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Longest a pod may stay unready before it is skipped
    pub fn ready_timeout(&self) -> Duration {
        self.ready_poll_interval * self.ready_max_attempts
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tail_lines: DEFAULT_TAIL_LINES,
            ready_poll_interval: DEFAULT_READY_POLL_INTERVAL,
            ready_max_attempts: DEFAULT_READY_MAX_ATTEMPTS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

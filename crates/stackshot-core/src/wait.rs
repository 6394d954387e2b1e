use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 720;

/// Delay between two polls of the stack status.
pub trait Waiter {
    fn wait(&mut self);
}

impl<F: FnMut()> Waiter for F {
    fn wait(&mut self) {
        self();
    }
}

/// Blocks the calling thread for a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepWaiter {
    pub interval: Duration,
}

impl SleepWaiter {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for SleepWaiter {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl Waiter for SleepWaiter {
    fn wait(&mut self) {
        std::thread::sleep(self.interval);
    }
}

/// Returns immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoWait;

impl Waiter for NoWait {
    fn wait(&mut self) {}
}

/// Poll loop bounds. The interval is constant; `max_attempts` is the only
/// escape from a stack that never settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

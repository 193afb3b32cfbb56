use std::time::Duration;

/// Exponential backoff used when the destination file is held by another process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        let clamped_base = base_delay.max(Duration::from_millis(1));
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: clamped_base,
            max_delay: max_delay.max(clamped_base),
        }
    }

    /// Delay to wait after the failed attempt number `attempt` (0-based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.min(31) as u32);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds or the attempts run out, sleeping the current
    /// thread between attempts. Returns the last error and the attempt count.
    pub fn retry<T, E, F>(&self, mut op: F) -> std::result::Result<T, (E, usize)>
    where
        F: FnMut(usize) -> std::result::Result<T, E>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err((err, attempt));
                    }
                    std::thread::sleep(self.delay_for(attempt - 1));
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(7, Duration::from_millis(50), Duration::from_secs(5))
    }
}

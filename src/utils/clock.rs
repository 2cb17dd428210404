use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Represents an entity responsible for providing time across the tracker. Swapping it out lets
/// tests drive the event loop with tokio's paused clock.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);

    /// Sleeps until the given wall-clock moment. Moments in the past resolve immediately.
    async fn sleep_until_time(&self, moment: DateTime<Utc>) {
        let left = (moment - self.time()).to_std().unwrap_or(Duration::ZERO);
        self.sleep(left).await;
    }
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
pub mod testing {
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use tokio::time::Instant;

    use super::Clock;

    /// Wall clock that follows tokio's (possibly paused) time, starting from a fixed moment.
    #[derive(Clone)]
    pub struct TestClock {
        start_time: DateTime<Utc>,
        reference: Instant,
    }

    impl TestClock {
        pub fn starting_at(start_time: DateTime<Utc>) -> Self {
            Self {
                start_time,
                reference: Instant::now(),
            }
        }
    }

    #[async_trait]
    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            self.start_time + self.reference.elapsed()
        }

        async fn sleep(&self, duration: Duration) {
            tokio::time::sleep(duration).await;
        }
    }
}

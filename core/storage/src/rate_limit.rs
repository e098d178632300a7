//! Token-bucket rate limiter for store requests.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket holding up to `requests_per_minute` tokens, refilled
/// continuously so the bucket goes from empty to full in one minute.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    /// Tokens per second.
    refill_rate: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a full bucket. A rate of zero is treated as one request per minute.
    pub fn new(requests_per_minute: u32) -> Self {
        let capacity = f64::from(requests_per_minute.max(1));
        Self {
            capacity,
            refill_rate: capacity / 60.0,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.capacity as u32
    }

    /// Wait until a token is available and take it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.capacity);
                bucket.last_refill = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.refill_rate)
            };

            debug!("Rate limit reached, waiting {:?}", wait);
            sleep(wait).await;
        }
    }

    /// Tokens currently available, after refill.
    pub async fn available(&self) -> f64 {
        let bucket = self.bucket.lock().await;
        let elapsed = bucket.last_refill.elapsed().as_secs_f64();
        (bucket.tokens + elapsed * self.refill_rate).min(self.capacity)
    }
}

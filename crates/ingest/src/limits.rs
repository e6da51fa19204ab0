use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub const MAX_INGEST_CONCURRENCY: usize = 32;

pub const CONCURRENCY_ENV: &str = "DOC_INGEST_CONCURRENCY";

/// Worker count when neither the config nor the environment sets one
pub fn default_concurrency() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    // Leave one core to the runtime on larger machines.
    let workers = if cpus <= 2 { cpus } else { cpus - 1 };
    workers.clamp(1, MAX_INGEST_CONCURRENCY)
}

pub(crate) fn parse_concurrency(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_INGEST_CONCURRENCY)
}

pub fn concurrency_from_env() -> usize {
    let raw = std::env::var(CONCURRENCY_ENV).ok();
    parse_concurrency(raw.as_deref(), default_concurrency())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterSnapshot {
    pub limit: usize,
    pub in_flight: usize,
    pub waiters: usize,
}

/// Bounded worker pool gate shared by every task of one pipeline
#[derive(Debug, Clone)]
pub struct IngestLimiter {
    limit: usize,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    waiters: Arc<AtomicUsize>,
}

impl IngestLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.clamp(1, MAX_INGEST_CONCURRENCY);
        Self {
            limit,
            semaphore: Arc::new(Semaphore::new(limit)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            waiters: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn snapshot(&self) -> LimiterSnapshot {
        LimiterSnapshot {
            limit: self.limit,
            in_flight: self.in_flight.load(Ordering::Relaxed),
            waiters: self.waiters.load(Ordering::Relaxed),
        }
    }

    pub(crate) async fn acquire(&self) -> IngestPermit {
        let waiter = WaiterGuard::new(self.waiters.clone());
        // The semaphore is owned here and never closed.
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .unwrap_or_else(|_| unreachable!("ingest semaphore closed"));
        drop(waiter);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        IngestPermit {
            _permit: permit,
            in_flight: self.in_flight.clone(),
        }
    }
}

pub(crate) struct IngestPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for IngestPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

struct WaiterGuard(Arc<AtomicUsize>);

impl WaiterGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_concurrency_defaults_and_clamps() {
        let default_value = default_concurrency();
        assert_eq!(parse_concurrency(None, default_value), default_value);
        assert_eq!(parse_concurrency(Some("  "), default_value), default_value);
        assert_eq!(parse_concurrency(Some("4"), default_value), 4);
        assert_eq!(parse_concurrency(Some("0"), default_value), 1);
        assert_eq!(
            parse_concurrency(Some("500"), default_value),
            MAX_INGEST_CONCURRENCY
        );
        assert_eq!(parse_concurrency(Some("many"), default_value), default_value);
        assert_eq!(parse_concurrency(Some(" 3 "), default_value), 3);
    }

    #[test]
    fn default_is_within_bounds() {
        let value = default_concurrency();
        assert!((1..=MAX_INGEST_CONCURRENCY).contains(&value));
    }

    #[tokio::test]
    async fn permits_track_in_flight_work() {
        let limiter = IngestLimiter::new(2);
        let first = limiter.acquire().await;
        let second = limiter.acquire().await;
        assert_eq!(
            limiter.snapshot(),
            LimiterSnapshot {
                limit: 2,
                in_flight: 2,
                waiters: 0
            }
        );

        drop(first);
        assert_eq!(limiter.snapshot().in_flight, 1);
        drop(second);
        assert_eq!(limiter.snapshot().in_flight, 0);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(IngestLimiter::new(0).snapshot().limit, 1);
        assert_eq!(
            IngestLimiter::new(100).snapshot().limit,
            MAX_INGEST_CONCURRENCY
        );
    }
}

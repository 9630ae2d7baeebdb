use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

#[derive(Debug)]
struct InnerMetrics {
    table: String,
    started_at: Instant,
    produced: AtomicU64,
    consumed: AtomicU64,
    errors: AtomicU64,
    batches_processed: AtomicU64,
    retry_count: AtomicU64,
}

/// Per-collection counters, shared by the producer and every consumer.
/// Cloning shares the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub produced: u64,
    pub consumed: u64,
    pub errors: u64,
    pub batches_processed: u64,
    pub retry_count: u64,
    pub elapsed: Duration,
}

impl Metrics {
    pub fn new(table: impl Into<String>) -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics {
                table: table.into(),
                started_at: Instant::now(),
                produced: AtomicU64::new(0),
                consumed: AtomicU64::new(0),
                errors: AtomicU64::new(0),
                batches_processed: AtomicU64::new(0),
                retry_count: AtomicU64::new(0),
            }),
        }
    }

    pub fn table(&self) -> &str {
        &self.inner.table
    }

    pub fn increment_produced(&self, count: u64) {
        self.inner.produced.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_consumed(&self, count: u64) {
        self.inner.consumed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_errors(&self, count: u64) {
        self.inner.errors.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_batches(&self, count: u64) {
        self.inner
            .batches_processed
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_retries(&self, count: u64) {
        self.inner.retry_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn produced(&self) -> u64 {
        self.inner.produced.load(Ordering::Relaxed)
    }

    pub fn consumed(&self) -> u64 {
        self.inner.consumed.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.inner.errors.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            produced: self.produced(),
            consumed: self.consumed(),
            errors: self.errors(),
            batches_processed: self.inner.batches_processed.load(Ordering::Relaxed),
            retry_count: self.inner.retry_count.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
        }
    }
}

impl MetricsSnapshot {
    /// Documents consumed per whole elapsed second; 0 within the first second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs();
        if secs == 0 {
            return 0.0;
        }
        self.consumed as f64 / secs as f64
    }

    /// Documents handed to the queue but not (yet) written.
    pub fn backlog(&self) -> u64 {
        self.produced.saturating_sub(self.consumed)
    }

    pub fn percent_complete(&self, total: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        self.consumed as f64 / total as f64 * 100.0
    }

    /// Seconds until `total` documents are consumed at the current rate;
    /// `None` while the rate is zero.
    pub fn eta_seconds(&self, total: u64) -> Option<u64> {
        let throughput = self.throughput();
        if throughput <= 0.0 {
            return None;
        }
        let remaining = total.saturating_sub(self.consumed);
        Some((remaining as f64 / throughput) as u64)
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snap = self.snapshot();
        write!(
            f,
            "CollectionMetrics[table={}, produced={}, consumed={}, errors={}, throughput={:.2} docs/sec, elapsed={} sec]",
            self.table(),
            snap.produced,
            snap.consumed,
            snap.errors,
            snap.throughput(),
            snap.elapsed.as_secs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(produced: u64, consumed: u64, elapsed_ms: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            produced,
            consumed,
            elapsed: Duration::from_millis(elapsed_ms),
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let metrics = Metrics::new("orders");
        let mut handles = Vec::new();
        for _ in 0..16 {
            let m = metrics.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..1000 {
                    m.increment_consumed(1);
                    m.increment_produced(2);
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(metrics.consumed(), 16_000);
        assert_eq!(metrics.produced(), 32_000);
        assert_eq!(metrics.errors(), 0);
    }

    #[test]
    fn test_throughput_is_zero_within_first_second() {
        assert_eq!(snapshot(100, 100, 999).throughput(), 0.0);
        assert_eq!(snapshot(100, 100, 2500).throughput(), 50.0);
    }

    #[test]
    fn test_backlog_and_percent() {
        let snap = snapshot(2000, 1500, 1000);
        assert_eq!(snap.backlog(), 500);
        assert_eq!(snap.percent_complete(3000), 50.0);
        assert_eq!(snap.percent_complete(0), 0.0);
    }

    #[test]
    fn test_eta_needs_a_rate() {
        assert_eq!(snapshot(0, 0, 500).eta_seconds(1000), None);
        // 100 docs/sec, 900 remaining
        assert_eq!(snapshot(100, 100, 1000).eta_seconds(1000), Some(9));
        assert_eq!(snapshot(100, 100, 1000).eta_seconds(50), Some(0));
    }

    #[test]
    fn test_display_format() {
        let metrics = Metrics::new("orders");
        metrics.increment_produced(10);
        metrics.increment_consumed(7);
        metrics.increment_errors(1);

        let text = metrics.to_string();
        assert!(text.starts_with(
            "CollectionMetrics[table=orders, produced=10, consumed=7, errors=1, throughput="
        ));
        assert!(text.ends_with(" sec]"));
    }
}

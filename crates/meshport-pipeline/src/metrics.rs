//! Conversion counters and duration percentiles.
//!
//! Counters are atomics; duration samples sit behind a mutex in a bounded
//! window.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use meshport_core::ConvertError;

/// Maximum number of duration samples kept.
const MAX_DURATION_SAMPLES: usize = 1000;

/// Conversion metrics collector, shared by all clones of a converter.
#[derive(Debug)]
pub struct ConversionMetrics {
    /// Conversions started.
    pub conversions_started: AtomicU64,
    /// Conversions that produced output.
    pub conversions_succeeded: AtomicU64,
    /// Conversions that failed for any reason.
    pub conversions_failed: AtomicU64,
    /// Failures caused by sliced packages.
    pub sliced_rejected: AtomicU64,
    /// Failures caused by unsupported formats.
    pub unsupported_rejected: AtomicU64,
    /// Source bytes read.
    pub total_input_bytes: AtomicU64,
    /// Encoded bytes produced.
    pub total_output_bytes: AtomicU64,
    duration_samples: Mutex<VecDeque<Duration>>,
}

impl ConversionMetrics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self {
            conversions_started: AtomicU64::new(0),
            conversions_succeeded: AtomicU64::new(0),
            conversions_failed: AtomicU64::new(0),
            sliced_rejected: AtomicU64::new(0),
            unsupported_rejected: AtomicU64::new(0),
            total_input_bytes: AtomicU64::new(0),
            total_output_bytes: AtomicU64::new(0),
            duration_samples: Mutex::new(VecDeque::with_capacity(MAX_DURATION_SAMPLES)),
        }
    }

    /// Record a conversion start.
    pub fn record_started(&self) {
        self.conversions_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record source bytes read.
    pub fn record_input(&self, bytes: u64) {
        self.total_input_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a successful conversion.
    pub fn record_success(&self, duration: Duration, output_bytes: u64) {
        self.conversions_succeeded.fetch_add(1, Ordering::Relaxed);
        self.total_output_bytes
            .fetch_add(output_bytes, Ordering::Relaxed);
        self.add_duration_sample(duration);
    }

    /// Record a failed conversion, classified by error kind.
    pub fn record_failure(&self, error: &ConvertError) {
        self.conversions_failed.fetch_add(1, Ordering::Relaxed);
        match error {
            ConvertError::SlicedFile { .. } => {
                self.sliced_rejected.fetch_add(1, Ordering::Relaxed);
            }
            ConvertError::UnsupportedFormat { .. } => {
                self.unsupported_rejected.fetch_add(1, Ordering::Relaxed);
            }
            ConvertError::Conversion { .. } => {}
        }
    }

    fn add_duration_sample(&self, duration: Duration) {
        if let Ok(mut samples) = self.duration_samples.lock() {
            if samples.len() >= MAX_DURATION_SAMPLES {
                samples.pop_front();
            }
            samples.push_back(duration);
        }
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let durations: Vec<Duration> = self
            .duration_samples
            .lock()
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();

        let (p50, p95, p99) = Self::calculate_percentiles(&durations);

        MetricsSnapshot {
            conversions_started: self.conversions_started.load(Ordering::Relaxed),
            conversions_succeeded: self.conversions_succeeded.load(Ordering::Relaxed),
            conversions_failed: self.conversions_failed.load(Ordering::Relaxed),
            sliced_rejected: self.sliced_rejected.load(Ordering::Relaxed),
            unsupported_rejected: self.unsupported_rejected.load(Ordering::Relaxed),
            total_input_bytes: self.total_input_bytes.load(Ordering::Relaxed),
            total_output_bytes: self.total_output_bytes.load(Ordering::Relaxed),
            duration_p50: p50,
            duration_p95: p95,
            duration_p99: p99,
            sample_count: durations.len() as u64,
        }
    }

    fn calculate_percentiles(
        durations: &[Duration],
    ) -> (Option<Duration>, Option<Duration>, Option<Duration>) {
        if durations.is_empty() {
            return (None, None, None);
        }

        let mut sorted = durations.to_vec();
        sorted.sort();
        let len = sorted.len();

        let p50 = sorted.get(len * 50 / 100).copied();
        let p95 = sorted.get(len * 95 / 100).copied();
        let p99 = sorted.get(len.saturating_sub(1) * 99 / 100).copied();

        (p50, p95, p99)
    }
}

impl Default for ConversionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable copy of [`ConversionMetrics`]. Durations are milliseconds.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub conversions_started: u64,
    pub conversions_succeeded: u64,
    pub conversions_failed: u64,
    pub sliced_rejected: u64,
    pub unsupported_rejected: u64,
    pub total_input_bytes: u64,
    pub total_output_bytes: u64,
    #[serde(
        serialize_with = "serialize_opt_duration",
        deserialize_with = "deserialize_opt_duration"
    )]
    pub duration_p50: Option<Duration>,
    #[serde(
        serialize_with = "serialize_opt_duration",
        deserialize_with = "deserialize_opt_duration"
    )]
    pub duration_p95: Option<Duration>,
    #[serde(
        serialize_with = "serialize_opt_duration",
        deserialize_with = "deserialize_opt_duration"
    )]
    pub duration_p99: Option<Duration>,
    pub sample_count: u64,
}

fn serialize_opt_duration<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match duration {
        Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
        None => serializer.serialize_none(),
    }
}

fn deserialize_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let millis: Option<u64> = serde::Deserialize::deserialize(deserializer)?;
    Ok(millis.map(Duration::from_millis))
}

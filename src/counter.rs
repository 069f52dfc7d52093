//! Cumulative fault and transfer counters
//!
//! Both counters are sampled before and after the timed traversal. The
//! page-fault counter reads the kernel's per-process rusage totals; the
//! transfer counter is fed by the runner at every read/write call boundary.

use std::cell::Cell;

use nix::sys::resource::{getrusage, UsageWho};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What a counter's value means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Minor + major page faults of this process
    PageFaults,
    /// Bytes moved by read/write calls
    BytesTransferred,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::PageFaults => "page_faults",
            Metric::BytesTransferred => "bytes",
        }
    }
}

/// A monotonically non-decreasing cumulative counter
pub trait Counter {
    /// Current cumulative value
    fn sample(&self) -> Result<u64>;

    /// Account for bytes moved by one call. Ignored by OS-backed counters.
    fn record(&self, _bytes: u64) {}

    fn metric(&self) -> Metric;
}

/// Page faults attributed to the calling process since it started
#[derive(Debug, Default, Clone, Copy)]
pub struct PageFaultCounter;

impl Counter for PageFaultCounter {
    fn sample(&self) -> Result<u64> {
        let usage = getrusage(UsageWho::RUSAGE_SELF)?;
        let minor = u64::try_from(usage.minor_page_faults()).unwrap_or(0);
        let major = u64::try_from(usage.major_page_faults()).unwrap_or(0);
        Ok(minor + major)
    }

    fn metric(&self) -> Metric {
        Metric::PageFaults
    }
}

/// Bytes transferred by the workload's own calls
#[derive(Debug, Default)]
pub struct TransferCounter {
    total: Cell<u64>,
    calls: Cell<u64>,
}

impl TransferCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls recorded so far
    pub fn calls(&self) -> u64 {
        self.calls.get()
    }
}

impl Counter for TransferCounter {
    fn sample(&self) -> Result<u64> {
        Ok(self.total.get())
    }

    fn record(&self, bytes: u64) {
        self.total.set(self.total.get().saturating_add(bytes));
        self.calls.set(self.calls.get() + 1);
    }

    fn metric(&self) -> Metric {
        Metric::BytesTransferred
    }
}

/// Difference between two samples of a counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delta {
    pub value: u64,
    /// True when `after < before` and the value was clamped to zero
    pub clamped: bool,
}

/// Compute `after - before`, clamping a decrease to zero
pub fn delta(before: u64, after: u64) -> Delta {
    match after.checked_sub(before) {
        Some(value) => Delta {
            value,
            clamped: false,
        },
        None => {
            tracing::warn!(before, after, "counter decreased, clamping delta to zero");
            Delta {
                value: 0,
                clamped: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_delta_normal() {
        assert_eq!(
            delta(10, 25),
            Delta {
                value: 15,
                clamped: false
            }
        );
    }

    #[test]
    fn test_delta_clamps_decrease() {
        let d = delta(25, 10);
        assert_eq!(d.value, 0);
        assert!(d.clamped);
    }

    #[test]
    fn test_transfer_counter_accumulates() {
        let c = TransferCounter::new();
        assert_eq!(c.sample().unwrap(), 0);

        c.record(4096);
        c.record(4096);
        c.record(100);

        assert_eq!(c.sample().unwrap(), 8292);
        assert_eq!(c.calls(), 3);
        assert_eq!(c.metric(), Metric::BytesTransferred);
    }

    #[test]
    #[serial]
    fn test_page_fault_counter_is_monotonic() {
        let c = PageFaultCounter;
        let before = c.sample().unwrap();
        let v = vec![1u8; 1 << 20];
        std::hint::black_box(&v);
        let after = c.sample().unwrap();
        assert!(after >= before);
    }

    #[test]
    fn test_page_fault_counter_ignores_record() {
        let c = PageFaultCounter;
        c.record(1 << 30);
        assert_eq!(c.metric(), Metric::PageFaults);
    }

    #[test]
    fn test_metric_labels() {
        assert_eq!(Metric::PageFaults.label(), "page_faults");
        assert_eq!(Metric::BytesTransferred.label(), "bytes");
    }
}

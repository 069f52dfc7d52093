//! Result aggregation and the reporting interface
//!
//! Trials are averaged into a [`RepetitionResult`] and handed to a
//! [`ReportSink`], which decides how rows are rendered.

use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{GIB, KIB, MIB};
use crate::counter::Metric;
use crate::scenario::{Scenario, Suite};

/// Raw sample from one hermetic trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrialResult {
    pub duration: Duration,
    /// Page faults or bytes transferred, depending on the fixture
    pub aux_count: u64,
    /// Units visited by the timed traversal
    pub visited: u64,
    /// Either the clock or the counter went backwards
    pub clamped: bool,
}

/// Mean of N trials for one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepetitionResult {
    pub name: String,
    pub size_bytes: u64,
    pub block_size: usize,
    pub metric: Metric,
    #[serde(rename = "time_us", with = "duration_us")]
    pub duration: Duration,
    pub aux_count: u64,
    pub visited: u64,
    pub throughput_mib_s: f64,
    /// Microseconds per fault; 0 for byte metrics or when nothing faulted
    pub per_unit_us: f64,
    pub trials: usize,
    pub clamped: bool,
    pub failed: bool,
}

impl RepetitionResult {
    /// Average `trials`; the size is constant so throughput is derived once
    pub fn from_trials(scenario: &Scenario, metric: Metric, trials: &[TrialResult]) -> Self {
        let n = trials.len();
        let (duration, aux_count, visited) = if n == 0 {
            (Duration::ZERO, 0, 0)
        } else {
            let total: Duration = trials.iter().map(|t| t.duration).sum();
            let aux: u64 = trials.iter().map(|t| t.aux_count).sum();
            let visited: u64 = trials.iter().map(|t| t.visited).sum();
            let n32 = u32::try_from(n).unwrap_or(u32::MAX);
            (total / n32, aux / n as u64, visited / n as u64)
        };

        let basis = match metric {
            Metric::PageFaults => scenario.size,
            Metric::BytesTransferred => aux_count,
        };
        Self {
            name: scenario.name.clone(),
            size_bytes: scenario.size,
            block_size: scenario.unit,
            metric,
            duration,
            aux_count,
            visited,
            throughput_mib_s: throughput_mib_s(basis, duration),
            per_unit_us: match metric {
                Metric::PageFaults => per_unit_us(duration, aux_count),
                Metric::BytesTransferred => 0.0,
            },
            trials: n,
            clamped: trials.iter().any(|t| t.clamped),
            failed: false,
        }
    }

    /// Zero-valued row for a scenario that could not be measured
    pub fn failed(scenario: &Scenario, metric: Metric) -> Self {
        Self {
            failed: true,
            ..Self::from_trials(scenario, metric, &[])
        }
    }

    /// Bytes the throughput is computed from
    pub fn bytes_moved(&self) -> u64 {
        match self.metric {
            Metric::PageFaults => self.size_bytes,
            Metric::BytesTransferred => self.aux_count,
        }
    }
}

/// MiB per second, 0 when no time elapsed
pub fn throughput_mib_s(bytes: u64, duration: Duration) -> f64 {
    let secs = duration.as_secs_f64();
    if secs > 0.0 {
        bytes as f64 / MIB as f64 / secs
    } else {
        0.0
    }
}

/// Microseconds per counted unit, 0 when nothing was counted
pub fn per_unit_us(duration: Duration, count: u64) -> f64 {
    if count > 0 {
        duration.as_secs_f64() * 1e6 / count as f64
    } else {
        0.0
    }
}

/// Compact byte label: `512B`, `4KB`, `16MB`, `1GB`
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= GIB && bytes % GIB == 0 {
        format!("{}GB", bytes / GIB)
    } else if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{}KB", bytes / KIB)
    } else {
        format!("{}B", bytes)
    }
}

/// Run-level facts shown in the opening banner
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub title: String,
    pub lines: Vec<String>,
}

/// Destination for benchmark output
pub trait ReportSink {
    fn begin(&mut self, info: &RunInfo) -> io::Result<()>;
    fn section(&mut self, title: &str, suite: Suite) -> io::Result<()>;
    fn row(&mut self, result: &RepetitionResult) -> io::Result<()>;
    /// A section that could not run at all
    fn note(&mut self, message: &str) -> io::Result<()>;
    fn finish(&mut self, banner: &str) -> io::Result<()>;
}

mod duration_us {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_micros(u64::deserialize(d)?))
    }
}

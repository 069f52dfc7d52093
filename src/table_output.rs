//! Fixed-width text tables
//!
//! Rows are written as soon as they are produced so progress is visible
//! during long runs. Memory and file sections use different columns.

use std::io::{self, Write};

use crate::config::{GIB, KIB, MIB};
use crate::report::{RepetitionResult, ReportSink, RunInfo};
use crate::scenario::Suite;

const BANNER_RULE: &str = "==============================================================";
const MEMORY_RULE: &str =
    "--------------------------------------------------------------------------------------";
const FILE_RULE: &str =
    "------------------------------------------------------------------------------------------";

/// Text table writer
pub struct TableOutput<W: Write> {
    out: W,
    suite: Suite,
    open_section: bool,
}

impl<W: Write> TableOutput<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            suite: Suite::Memory,
            open_section: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn header(&mut self) -> io::Result<()> {
        match self.suite {
            Suite::Memory => {
                writeln!(
                    self.out,
                    "{:<25} {:>10} {:>12} {:>10} {:>12} {:>10}",
                    "Test", "Size", "Time(us)", "Faults", "us/fault", "Speed"
                )?;
                writeln!(self.out, "{}", MEMORY_RULE)
            }
            Suite::File => {
                writeln!(
                    self.out,
                    "{:<40} {:>10} {:>10} {:>12} {:>12}",
                    "Test", "Size", "Block", "Time(us)", "MB/s"
                )?;
                writeln!(self.out, "{}", FILE_RULE)
            }
        }
    }
}

fn memory_size(bytes: u64) -> String {
    if bytes >= GIB {
        format!("{} GB", bytes / GIB)
    } else {
        format!("{} MB", bytes / MIB)
    }
}

fn marker(r: &RepetitionResult) -> &'static str {
    if r.failed {
        "  [failed]"
    } else if r.clamped {
        "  [clamped]"
    } else {
        ""
    }
}

impl<W: Write> ReportSink for TableOutput<W> {
    fn begin(&mut self, info: &RunInfo) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{}", BANNER_RULE)?;
        writeln!(self.out, "    {}", info.title)?;
        for line in &info.lines {
            writeln!(self.out, "    {}", line)?;
        }
        writeln!(self.out, "{}", BANNER_RULE)
    }

    fn section(&mut self, title: &str, suite: Suite) -> io::Result<()> {
        if self.open_section {
            writeln!(self.out)?;
        }
        self.suite = suite;
        self.open_section = true;
        writeln!(self.out, "{}", title)?;
        self.header()
    }

    fn row(&mut self, r: &RepetitionResult) -> io::Result<()> {
        let time_us = r.duration.as_micros();
        match self.suite {
            Suite::Memory => writeln!(
                self.out,
                "{:<25} {:>10} {:>12} {:>10} {:>12.3} {:>7.0} MB/s{}",
                r.name,
                memory_size(r.size_bytes),
                time_us,
                r.aux_count,
                r.per_unit_us,
                r.throughput_mib_s,
                marker(r)
            ),
            Suite::File => writeln!(
                self.out,
                "{:<40} {:>8}KB {:>8}B {:>12} {:>12.2}{}",
                r.name,
                r.bytes_moved() / KIB,
                r.block_size,
                time_us,
                r.throughput_mib_s,
                marker(r)
            ),
        }
    }

    fn note(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "Error: {}", message)
    }

    fn finish(&mut self, banner: &str) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{}", BANNER_RULE)?;
        writeln!(self.out, "    {}", banner)?;
        writeln!(self.out, "{}", BANNER_RULE)?;
        self.out.flush()
    }
}

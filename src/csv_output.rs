//! CSV output for spreadsheet analysis

use std::io::{self, Write};

use crate::report::{RepetitionResult, ReportSink, RunInfo};
use crate::scenario::Suite;

const HEADER: &str =
    "section,test,size_bytes,block_size,metric,time_us,aux_count,per_unit_us,throughput_mib_s,failed";

/// CSV formatter; rows are buffered and written on finish
pub struct CsvOutput<W: Write> {
    out: W,
    section: String,
    rows: Vec<String>,
}

impl<W: Write> CsvOutput<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            section: String::new(),
            rows: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_row(&self, r: &RepetitionResult) -> String {
        [
            Self::escape_field(&self.section),
            Self::escape_field(&r.name),
            r.size_bytes.to_string(),
            r.block_size.to_string(),
            r.metric.label().to_string(),
            r.duration.as_micros().to_string(),
            r.aux_count.to_string(),
            format!("{:.3}", r.per_unit_us),
            format!("{:.2}", r.throughput_mib_s),
            r.failed.to_string(),
        ]
        .join(",")
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(HEADER);
        output.push('\n');
        for row in &self.rows {
            output.push_str(row);
            output.push('\n');
        }
        output
    }
}

impl<W: Write> ReportSink for CsvOutput<W> {
    fn begin(&mut self, info: &RunInfo) -> io::Result<()> {
        eprintln!("{}", info.title);
        Ok(())
    }

    fn section(&mut self, title: &str, _suite: Suite) -> io::Result<()> {
        self.section = title.to_string();
        Ok(())
    }

    fn row(&mut self, result: &RepetitionResult) -> io::Result<()> {
        let row = self.format_row(result);
        self.rows.push(row);
        Ok(())
    }

    /// Diagnostics already reach stderr from the driver
    fn note(&mut self, _message: &str) -> io::Result<()> {
        Ok(())
    }

    fn finish(&mut self, banner: &str) -> io::Result<()> {
        let csv = self.to_csv();
        self.out.write_all(csv.as_bytes())?;
        self.out.flush()?;
        eprintln!("{}", banner);
        Ok(())
    }
}

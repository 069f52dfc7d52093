//! JSON output format for benchmark results
//!
//! The whole run is buffered and written as one document when the driver
//! finishes, so stdout stays parseable. Banner titles also go to stderr;
//! their detail lines are kept in `runs`.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::report::{RepetitionResult, ReportSink, RunInfo};
use crate::scenario::Suite;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSection {
    pub title: String,
    pub suite: String,
    pub rows: Vec<RepetitionResult>,
    /// Diagnostics for work in this section that could not run
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

/// One suite's opening banner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRun {
    pub title: String,
    pub info: Vec<String>,
    /// Diagnostics raised before the suite's first section
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    pub tool: String,
    pub version: String,
    pub iterations: usize,
    pub runs: Vec<JsonRun>,
    pub sections: Vec<JsonSection>,
    /// Diagnostics with no enclosing run
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

impl JsonOutput {
    pub fn new(iterations: usize) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            iterations,
            runs: Vec::new(),
            sections: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Sink that collects a [`JsonOutput`] and writes it on finish
pub struct JsonSink<W: Write> {
    out: W,
    doc: JsonOutput,
    /// A section was opened since the last `begin`
    section_open: bool,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W, iterations: usize) -> Self {
        Self {
            out,
            doc: JsonOutput::new(iterations),
            section_open: false,
        }
    }

    pub fn document(&self) -> &JsonOutput {
        &self.doc
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn begin(&mut self, info: &RunInfo) -> io::Result<()> {
        eprintln!("{}", info.title);
        self.doc.runs.push(JsonRun {
            title: info.title.clone(),
            info: info.lines.clone(),
            notes: Vec::new(),
        });
        self.section_open = false;
        Ok(())
    }

    fn section(&mut self, title: &str, suite: Suite) -> io::Result<()> {
        self.doc.sections.push(JsonSection {
            title: title.to_string(),
            suite: match suite {
                Suite::Memory => "memory",
                Suite::File => "file",
            }
            .to_string(),
            rows: Vec::new(),
            notes: Vec::new(),
        });
        self.section_open = true;
        Ok(())
    }

    fn row(&mut self, result: &RepetitionResult) -> io::Result<()> {
        if let Some(section) = self.doc.sections.last_mut() {
            section.rows.push(result.clone());
        }
        Ok(())
    }

    fn note(&mut self, message: &str) -> io::Result<()> {
        let notes = if self.section_open {
            self.doc.sections.last_mut().map(|s| &mut s.notes)
        } else {
            self.doc.runs.last_mut().map(|r| &mut r.notes)
        };
        notes.unwrap_or(&mut self.doc.notes).push(message.to_string());
        Ok(())
    }

    fn finish(&mut self, banner: &str) -> io::Result<()> {
        let json = self.doc.to_json().map_err(io::Error::other)?;
        writeln!(self.out, "{}", json)?;
        self.out.flush()?;
        eprintln!("{}", banner);
        Ok(())
    }
}

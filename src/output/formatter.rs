//! Per-iteration report lines
//!
//! Each reported iteration becomes one line: the latency, or
//! `relative_send,latency` when timestamps are enabled. The relative send time
//! is measured from the send of the first reported iteration.

use crate::clock::{Nanos, Timestamp};
use crate::error::Result;
use crate::ledger::Ledger;
use crate::models::RunConfig;
use crate::types::TimeUnit;
use serde::Serialize;
use std::io::Write;

/// Counts returned once the report is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReportSummary {
    /// Lines written
    pub lines: u64,
    /// Samples the ledger held, skipped ones included
    pub recorded: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportFormatter {
    unit: TimeUnit,
    precision: usize,
    timestamps: bool,
    skip: u64,
}

impl ReportFormatter {
    pub fn new(unit: TimeUnit, precision: usize, timestamps: bool, skip: u64) -> Self {
        Self {
            unit,
            precision,
            timestamps,
            skip,
        }
    }

    pub fn from_run(run: &RunConfig) -> Self {
        Self::new(run.unit, run.precision, run.timestamps, run.skip)
    }

    /// A single value in the configured unit and precision
    pub fn format_value(&self, value: Nanos) -> String {
        format!("{:.*}", self.precision, value.to_unit(self.unit))
    }

    /// One report line without the trailing newline
    pub fn format_line(&self, relative_send: Nanos, latency: Nanos) -> String {
        if self.timestamps {
            format!("{},{}", self.format_value(relative_send), self.format_value(latency))
        } else {
            self.format_value(latency)
        }
    }

    fn write_line<W: Write>(&self, out: &mut W, relative_send: Nanos, latency: Nanos) -> Result<()> {
        let precision = self.precision;
        if self.timestamps {
            writeln!(
                out,
                "{:.*},{:.*}",
                precision,
                relative_send.to_unit(self.unit),
                precision,
                latency.to_unit(self.unit)
            )?;
        } else {
            writeln!(out, "{:.*}", precision, latency.to_unit(self.unit))?;
        }
        Ok(())
    }

    /// Consume the ledger and write one line per reported iteration.
    ///
    /// Pages are released as soon as their last sample has been written, so
    /// peak memory during reporting never exceeds the ledger's.
    pub fn write_report<W: Write>(&self, ledger: Ledger, out: &mut W) -> Result<ReportSummary> {
        let mut summary = ReportSummary {
            lines: 0,
            recorded: ledger.len(),
        };
        let mut zero: Option<Timestamp> = None;

        for (index, sample) in ledger.into_drain() {
            if index < self.skip {
                continue;
            }
            let origin = *zero.get_or_insert(sample.send_ts);
            self.write_line(out, sample.send_ts - origin, sample.latency())?;
            summary.lines += 1;
        }

        out.flush()?;
        Ok(summary)
    }
}

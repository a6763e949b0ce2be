//! Human-readable run header and footer, written to stderr in verbose mode

use super::formatter::ReportSummary;
use crate::clock::Nanos;
use crate::executor::ResponderSummary;
use crate::models::{RunConfig, Termination};
use crate::types::TimeUnit;
use colored::*;
use std::fmt::Write as _;

pub struct RunBanner {
    use_color: bool,
}

impl RunBanner {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn heading(&self, text: &str) -> String {
        if self.use_color {
            text.bold().cyan().to_string()
        } else {
            text.to_string()
        }
    }

    fn label(&self, text: &str) -> String {
        if self.use_color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    /// Describe what is about to run
    pub fn header(&self, run: &RunConfig, transport: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.heading(&format!("{} v{}", crate::PKG_NAME, crate::VERSION)));

        let termination = match run.termination {
            Termination::Iterations(count) => format!("{} iterations", count),
            Termination::Duration(duration) => format!("{:.3}s", duration.to_unit(TimeUnit::S)),
        };
        let pacing = if run.pacing_interval == Nanos::ZERO {
            "unthrottled".to_string()
        } else {
            format!("every {:.3}us", run.pacing_interval.to_unit(TimeUnit::Us))
        };

        let _ = writeln!(out, "  {} {}", self.label("Run:      "), termination);
        let _ = writeln!(out, "  {} {}", self.label("Warm-up:  "), run.skip);
        let _ = writeln!(out, "  {} {}", self.label("Pacing:   "), pacing);
        let _ = writeln!(out, "  {} {} bytes, {}", self.label("Payload:  "), run.message_size, run.mode);
        let _ = writeln!(out, "  {} {}", self.label("Transport:"), transport);
        let _ = write!(out, "  {} {}", self.label("Units:    "), run.unit);
        out
    }

    /// Summarize a finished initiator run
    pub fn footer(&self, report: &ReportSummary, elapsed: Nanos, responder: Option<&ResponderSummary>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.heading("Run complete"));
        let _ = writeln!(out, "  {} {}", self.label("Recorded: "), report.recorded);
        let _ = writeln!(out, "  {} {}", self.label("Reported: "), report.lines);
        let _ = write!(out, "  {} {:.6}s", self.label("Elapsed:  "), elapsed.to_unit(TimeUnit::S));

        if let Some(responder) = responder {
            let _ = write!(
                out,
                "\n  {} {} handled, {} echoed",
                self.label("Responder:"),
                responder.handled,
                responder.echoed
            );
            if let Some(announced) = responder.count_mismatch() {
                let warning = format!("announced {} payloads, saw {}", announced, responder.timed_payloads());
                let warning = if self.use_color { warning.yellow().to_string() } else { warning };
                let _ = write!(out, "\n  {}", warning);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SetupMessage;
    use crate::types::ExchangeMode;

    #[test]
    fn test_header_plain() {
        let run = RunConfig {
            termination: Termination::Iterations(100),
            skip: 10,
            mode: ExchangeMode::Echo,
            message_size: 64,
            ..RunConfig::default()
        };
        let header = RunBanner::new(false).header(&run, "local");

        assert!(header.contains("100 iterations"));
        assert!(header.contains("64 bytes, echo"));
        assert!(header.contains("Transport: local"));
        assert!(!header.contains('\u{1b}'));
    }

    #[test]
    fn test_header_duration_and_pacing() {
        let run = RunConfig {
            termination: Termination::Duration(Nanos::new(2_500_000_000)),
            pacing_interval: Nanos::new(50_000),
            ..RunConfig::default()
        };
        let header = RunBanner::new(false).header(&run, "tcp");
        assert!(header.contains("2.500s"));
        assert!(header.contains("every 50.000us"));
    }

    #[test]
    fn test_footer_reports_mismatch() {
        let report = ReportSummary { lines: 8, recorded: 10 };
        let responder = ResponderSummary {
            setup: SetupMessage { message_size: 4, iterations: 12 },
            handled: 11,
            echoed: 0,
            stopped: true,
        };
        let footer = RunBanner::new(false).footer(&report, Nanos::new(1_000_000), Some(&responder));

        assert!(footer.contains("Reported:  8"));
        assert!(footer.contains("0.001000s"));
        assert!(footer.contains("announced 12 payloads, saw 10"));
    }

    #[test]
    fn test_footer_without_responder() {
        let footer = RunBanner::new(false).footer(&ReportSummary::default(), Nanos::ZERO, None);
        assert!(!footer.contains("Responder"));
    }
}

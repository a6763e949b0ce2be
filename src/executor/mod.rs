//! Benchmark execution engine
//!
//! The initiator drives the timed loop and owns the ledger; the responder
//! mirrors it on the other end of a [`Transport`]. Stopping rules live in
//! [`stop`].

pub mod initiator;
pub mod responder;
pub mod stop;

pub use initiator::{Initiator, InitiatorReport, InitiatorState};
pub use responder::{Responder, ResponderState, ResponderSummary};
pub use stop::StopCondition;

use crate::clock::{Clock, Nanos};
use crate::error::Result;
use crate::ledger::Ledger;
use crate::logging::RunLogger;
use crate::models::RunConfig;
use crate::transport::{LocalTransport, Transport};

/// Result of a completed run on the initiator side
#[derive(Debug)]
pub struct RunOutcome {
    pub ledger: Ledger,
    /// Samples in the ledger, skipped ones included
    pub recorded: u64,
    pub elapsed: Nanos,
    /// Present when the responder ran in this process
    pub responder: Option<ResponderSummary>,
}

impl RunOutcome {
    fn from_report(report: InitiatorReport, responder: Option<ResponderSummary>) -> Self {
        Self {
            recorded: report.ledger.len(),
            ledger: report.ledger,
            elapsed: report.elapsed,
            responder,
        }
    }
}

/// Run both roles in this process over an in-memory transport pair
pub async fn run_local<C>(run: RunConfig, clock: C, logger: Option<RunLogger>) -> Result<RunOutcome>
where
    C: Clock + 'static,
{
    let (initiator_end, responder_end) = LocalTransport::pair();

    let mut responder = Responder::new(responder_end);
    let mut initiator = Initiator::new(initiator_end, clock, run);
    if let Some(logger) = logger {
        responder = responder.with_logger(logger.clone());
        initiator = initiator.with_logger(logger);
    }

    let responder = tokio::spawn(responder.run());
    // Dropping the initiator endpoint on failure unblocks the responder
    let report = initiator.run().await;
    let summary = responder.await?;

    let report = report?;
    Ok(RunOutcome::from_report(report, Some(summary?)))
}

/// Run the initiator role against a remote responder
pub async fn run_initiator<T, C>(transport: T, run: RunConfig, clock: C, logger: Option<RunLogger>) -> Result<RunOutcome>
where
    T: Transport,
    C: Clock,
{
    let mut initiator = Initiator::new(transport, clock, run);
    if let Some(logger) = logger {
        initiator = initiator.with_logger(logger);
    }
    let report = initiator.run().await?;
    Ok(RunOutcome::from_report(report, None))
}

/// Run the responder role until the initiator sends STOP
pub async fn run_responder<T: Transport>(transport: T, logger: Option<RunLogger>) -> Result<ResponderSummary> {
    let mut responder = Responder::new(transport);
    if let Some(logger) = logger {
        responder = responder.with_logger(logger);
    }
    responder.run().await
}

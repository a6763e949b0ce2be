//! Initiator role: paces sends, stamps timestamps and fills the ledger

use super::stop::StopCondition;
use crate::clock::{Clock, Nanos, Timestamp};
use crate::error::{AppError, Result};
use crate::ledger::Ledger;
use crate::logging::{Role, RunLogger};
use crate::models::RunConfig;
use crate::pacing::PacingController;
use crate::protocol::{ControlFlags, Payload, SetupMessage, DATA_TAG, SETUP_TAG};
use crate::transport::Transport;
use crate::types::ExchangeMode;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiatorState {
    AwaitSetup,
    Running,
    Draining,
    Done,
}

impl InitiatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InitiatorState::AwaitSetup => "await-setup",
            InitiatorState::Running => "running",
            InitiatorState::Draining => "draining",
            InitiatorState::Done => "done",
        }
    }
}

impl fmt::Display for InitiatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the timed loop produced
#[derive(Debug)]
pub struct InitiatorReport {
    pub ledger: Ledger,
    /// From the first poll to the end of the last exchange
    pub elapsed: Nanos,
}

pub struct Initiator<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    run: RunConfig,
    state: InitiatorState,
    logger: Option<RunLogger>,
}

impl<T: Transport, C: Clock> Initiator<T, C> {
    pub fn new(transport: T, clock: C, run: RunConfig) -> Self {
        Self {
            transport,
            clock,
            run,
            state: InitiatorState::AwaitSetup,
            logger: None,
        }
    }

    /// Log state transitions; entries are only written outside the timed loop
    pub fn with_logger(mut self, logger: RunLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn state(&self) -> InitiatorState {
        self.state
    }

    /// Run setup, the timed loop and the final STOP
    pub async fn run(mut self) -> Result<InitiatorReport> {
        self.setup().await?;
        let report = self.drive().await?;
        self.drain().await?;
        Ok(report)
    }

    async fn transition(&mut self, to: InitiatorState) {
        if let Some(logger) = &self.logger {
            logger.log_state(Role::Initiator, self.state.as_str(), to.as_str()).await;
        }
        self.state = to;
    }

    fn expect_state(&self, expected: InitiatorState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(AppError::internal(format!(
                "initiator is {}, expected {}",
                self.state, expected
            )))
        }
    }

    /// Announce message size and iteration count; returns once the responder
    /// has started receiving it
    pub async fn setup(&mut self) -> Result<()> {
        self.expect_state(InitiatorState::AwaitSetup)?;

        let setup = SetupMessage {
            message_size: self.run.message_size,
            iterations: self.run.setup_iterations(),
        };
        let peer = self.transport.peer();
        self.transport.sync_send(peer, SETUP_TAG, &setup.encode()?).await?;

        self.transition(InitiatorState::Running).await;
        Ok(())
    }

    /// The timed loop. Busy-polls the clock; suspends only inside transport calls.
    pub async fn drive(&mut self) -> Result<InitiatorReport> {
        self.expect_state(InitiatorState::Running)?;

        let echo = self.run.mode == ExchangeMode::Echo;
        let payload = Payload::new(self.run.message_size, ControlFlags::new(false, echo))?;
        let mut reply = Vec::with_capacity(self.run.message_size);
        let mut ledger = Ledger::with_page_capacity(self.run.page_size)?;
        ledger.reserve_next()?;
        let mut pacing = PacingController::new(self.run.pacing_interval);
        let mut stop = StopCondition::new(self.run.termination, self.run.skip);

        let mut index: u64 = 0;
        let mut last_poll: Option<Timestamp> = None;
        let first_poll = self.clock.now();

        loop {
            let now = self.clock.now();
            let elapsed = last_poll.map_or(Nanos::ZERO, |previous| now - previous);
            last_poll = Some(now);

            let due = pacing.poll(elapsed);
            if stop.should_stop(index, now) {
                break;
            }
            if !due {
                std::hint::spin_loop();
                continue;
            }

            let handle = ledger.record_send(index, now)?;
            stop.observe_send(index, now);

            self.exchange(payload.as_bytes(), &mut reply).await?;

            ledger.record_receive(handle, self.clock.now())?;
            // Page for the next send is allocated outside the send/receive span
            ledger.reserve_next()?;
            pacing.drain();
            index += 1;
        }

        let finished = last_poll.unwrap_or(first_poll);
        self.transition(InitiatorState::Draining).await;

        Ok(InitiatorReport {
            ledger,
            elapsed: finished - first_poll,
        })
    }

    async fn exchange(&mut self, payload: &[u8], reply: &mut Vec<u8>) -> Result<()> {
        let peer = self.transport.peer();
        match self.run.mode {
            ExchangeMode::Echo => {
                self.transport.send(peer, DATA_TAG, payload).await?;
                self.transport.recv(peer, DATA_TAG, reply).await?;
                if reply.len() != payload.len() {
                    return Err(AppError::protocol(format!(
                        "echo of {} bytes for a {} byte payload",
                        reply.len(),
                        payload.len()
                    )));
                }
                Ok(())
            }
            ExchangeMode::OneWay => self.transport.sync_send(peer, DATA_TAG, payload).await,
        }
    }

    /// Tell the responder to leave its loop
    pub async fn drain(&mut self) -> Result<()> {
        self.expect_state(InitiatorState::Draining)?;

        let stop = Payload::new(self.run.message_size, ControlFlags::new(true, false))?;
        let peer = self.transport.peer();
        self.transport.async_send(peer, DATA_TAG, stop.as_bytes()).await?;

        self.transition(InitiatorState::Done).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::executor::responder::Responder;
    use crate::models::Termination;
    use crate::transport::LocalTransport;
    use std::sync::Arc;

    fn run_config(termination: Termination, skip: u64, mode: ExchangeMode) -> RunConfig {
        RunConfig {
            termination,
            skip,
            mode,
            page_size: 4,
            ..RunConfig::default()
        }
    }

    async fn run_pair(run: RunConfig, clock: Arc<ManualClock>) -> (InitiatorReport, crate::executor::ResponderSummary) {
        let (initiator, responder) = LocalTransport::pair();
        let responder = tokio::spawn(Responder::new(responder).run());
        let report = Initiator::new(initiator, clock, run).run().await.unwrap();
        (report, responder.await.unwrap().unwrap())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_count_mode_records_skip_plus_requested() {
        let clock = Arc::new(ManualClock::new(Timestamp::ZERO, Nanos::new(10)));
        let (report, summary) = run_pair(run_config(Termination::Iterations(20), 5, ExchangeMode::OneWay), clock).await;

        assert_eq!(report.ledger.len(), 25);
        assert_eq!(report.ledger.pages_held(), 7);
        assert_eq!(summary.setup.iterations, 25);
        assert_eq!(summary.timed_payloads(), 25);
        assert_eq!(summary.echoed, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_echo_mode_round_trips() {
        let clock = Arc::new(ManualClock::new(Timestamp::ZERO, Nanos::new(10)));
        let (report, summary) = run_pair(run_config(Termination::Iterations(6), 0, ExchangeMode::Echo), clock).await;

        assert_eq!(report.ledger.len(), 6);
        assert_eq!(summary.echoed, 6);
        assert_eq!(summary.handled, 7);
        assert!(report.ledger.iter().all(|sample| !sample.latency().is_negative()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_duration_mode_stops_on_time() {
        // Every clock read advances 1us; the run should last 200us after warm-up
        let clock = Arc::new(ManualClock::new(Timestamp::ZERO, Nanos::new(1_000)));
        let run = run_config(Termination::Duration(Nanos::new(200_000)), 3, ExchangeMode::OneWay);
        let (report, summary) = run_pair(run, clock).await;

        let samples: Vec<_> = report.ledger.iter().copied().collect();
        assert!(samples.len() > 3);
        let start = samples[3].send_ts;
        let last = samples[samples.len() - 1].send_ts;
        assert!(last - start < Nanos::new(200_000));
        assert_eq!(summary.setup.iterations, 0);
        assert_eq!(summary.timed_payloads(), samples.len() as u64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_next_page_reserved_after_boundary_receive() {
        // Eight samples fill two pages of four; the third is held before a ninth send
        let clock = Arc::new(ManualClock::new(Timestamp::ZERO, Nanos::new(10)));
        let (report, _) = run_pair(run_config(Termination::Iterations(8), 0, ExchangeMode::OneWay), clock).await;

        assert_eq!(report.ledger.len(), 8);
        assert_eq!(report.ledger.pages_held(), 3);
        assert_eq!(report.ledger.into_drain().count(), 8);
    }

    #[tokio::test]
    async fn test_drive_requires_setup() {
        let (initiator, _responder) = LocalTransport::pair();
        let clock = ManualClock::frozen(Timestamp::ZERO);
        let mut initiator = Initiator::new(initiator, clock, RunConfig::default());
        assert_eq!(initiator.state(), InitiatorState::AwaitSetup);
        assert_eq!(initiator.drive().await.unwrap_err().category(), "INTERNAL");
    }

    #[tokio::test]
    async fn test_lost_responder_aborts_run() {
        let (initiator, responder) = LocalTransport::pair();
        drop(responder);
        let clock = ManualClock::new(Timestamp::ZERO, Nanos::new(1));
        let err = Initiator::new(initiator, clock, RunConfig::default()).run().await.unwrap_err();
        assert_eq!(err.category(), "TRANSPORT");
    }
}

//! Responder role: receives payloads and obeys their control byte

use crate::error::{AppError, Result};
use crate::logging::{Role, RunLogger};
use crate::protocol::{ControlFlags, SetupMessage, DATA_TAG, SETUP_TAG};
use crate::transport::Transport;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    AwaitSetup,
    Looping,
    Done,
}

impl ResponderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponderState::AwaitSetup => "await-setup",
            ResponderState::Looping => "looping",
            ResponderState::Done => "done",
        }
    }
}

impl fmt::Display for ResponderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the responder saw during one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResponderSummary {
    pub setup: SetupMessage,
    /// Payloads received, the final STOP included
    pub handled: u64,
    /// Payloads sent back
    pub echoed: u64,
    /// Whether the last payload was a STOP
    pub stopped: bool,
}

impl ResponderSummary {
    /// Payloads that belonged to timed iterations
    pub fn timed_payloads(&self) -> u64 {
        if self.stopped {
            self.handled.saturating_sub(1)
        } else {
            self.handled
        }
    }

    /// The announced count when it differs from what arrived; count mode only
    pub fn count_mismatch(&self) -> Option<u64> {
        if self.setup.is_duration_mode() || self.setup.iterations == self.timed_payloads() {
            None
        } else {
            Some(self.setup.iterations)
        }
    }
}

pub struct Responder<T: Transport> {
    transport: T,
    state: ResponderState,
    logger: Option<RunLogger>,
}

impl<T: Transport> Responder<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ResponderState::AwaitSetup,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: RunLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn state(&self) -> ResponderState {
        self.state
    }

    async fn transition(&mut self, to: ResponderState) {
        if let Some(logger) = &self.logger {
            logger.log_state(Role::Responder, self.state.as_str(), to.as_str()).await;
        }
        self.state = to;
    }

    /// Receive the setup message, then handle payloads until one carries STOP
    pub async fn run(mut self) -> Result<ResponderSummary> {
        let peer = self.transport.peer();
        let mut buf = Vec::new();

        self.transport.recv(peer, SETUP_TAG, &mut buf).await?;
        let setup = SetupMessage::decode(&buf)?;
        buf.reserve(setup.message_size);
        self.transition(ResponderState::Looping).await;

        let mut summary = ResponderSummary {
            setup,
            handled: 0,
            echoed: 0,
            stopped: false,
        };

        loop {
            self.transport.recv(peer, DATA_TAG, &mut buf).await?;
            if buf.len() != setup.message_size {
                return Err(AppError::protocol(format!(
                    "received {} bytes, setup announced {}",
                    buf.len(),
                    setup.message_size
                )));
            }

            let flags = ControlFlags::from_payload(&buf)?;
            summary.handled += 1;

            if flags.echo {
                self.transport.async_send(peer, DATA_TAG, &buf).await?;
                summary.echoed += 1;
            }
            if flags.stop {
                summary.stopped = true;
                break;
            }
        }

        self.transition(ResponderState::Done).await;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ControlBit, Payload, INITIATOR_RANK, RESPONDER_RANK};
    use crate::transport::LocalTransport;

    async fn send_setup(initiator: &mut LocalTransport, message_size: usize, iterations: u64) {
        let setup = SetupMessage { message_size, iterations };
        initiator
            .sync_send(RESPONDER_RANK, SETUP_TAG, &setup.encode().unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_and_echo_replies_once_then_exits() {
        let (mut initiator, responder) = LocalTransport::pair();
        let task = tokio::spawn(Responder::new(responder).run());

        send_setup(&mut initiator, 4, 1).await;
        let both = Payload::new(4, ControlFlags::new(true, true)).unwrap();
        initiator.send(RESPONDER_RANK, DATA_TAG, both.as_bytes()).await.unwrap();

        let mut reply = Vec::new();
        initiator.recv(RESPONDER_RANK, DATA_TAG, &mut reply).await.unwrap();
        assert_eq!(reply[0], ControlBit::Stop.mask() | ControlBit::Echo.mask());

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.handled, 1);
        assert_eq!(summary.echoed, 1);
        assert_eq!(summary.timed_payloads(), 0);
    }

    #[tokio::test]
    async fn test_stop_without_echo_sends_nothing_back() {
        let (mut initiator, responder) = LocalTransport::pair();
        let task = tokio::spawn(Responder::new(responder).run());

        send_setup(&mut initiator, 2, 0).await;
        let stop = Payload::new(2, ControlFlags::new(true, false)).unwrap();
        initiator.async_send(RESPONDER_RANK, DATA_TAG, stop.as_bytes()).await.unwrap();

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.echoed, 0);
        assert!(summary.stopped);
        assert!(summary.count_mismatch().is_none());

        // Responder endpoint is gone, so nothing can arrive
        let mut reply = Vec::new();
        assert!(initiator.recv(RESPONDER_RANK, DATA_TAG, &mut reply).await.is_err());
    }

    #[tokio::test]
    async fn test_wrong_payload_size_is_protocol_error() {
        let (mut initiator, responder) = LocalTransport::pair();
        let task = tokio::spawn(Responder::new(responder).run());

        send_setup(&mut initiator, 8, 3).await;
        initiator.send(RESPONDER_RANK, DATA_TAG, &[0, 0]).await.unwrap();

        assert_eq!(task.await.unwrap().unwrap_err().category(), "PROTOCOL");
    }

    #[tokio::test]
    async fn test_oversized_setup_is_protocol_error() {
        let (mut initiator, responder) = LocalTransport::pair();
        let task = tokio::spawn(Responder::new(responder).run());

        let setup = serde_json::to_vec(&serde_json::json!({"message_size": u64::MAX, "iterations": 1})).unwrap();
        initiator.sync_send(RESPONDER_RANK, SETUP_TAG, &setup).await.unwrap();

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.category(), "PROTOCOL");
    }

    #[tokio::test]
    async fn test_unknown_control_bits_rejected() {
        let (mut initiator, responder) = LocalTransport::pair();
        let task = tokio::spawn(Responder::new(responder).run());

        send_setup(&mut initiator, 1, 1).await;
        initiator.send(RESPONDER_RANK, DATA_TAG, &[0x80]).await.unwrap();

        assert_eq!(task.await.unwrap().unwrap_err().category(), "PROTOCOL");
    }

    #[tokio::test]
    async fn test_initiator_vanishing_is_transport_error() {
        let (initiator, responder) = LocalTransport::pair();
        drop(initiator);
        let err = Responder::new(responder).run().await.unwrap_err();
        assert_eq!(err.category(), "TRANSPORT");
    }

    #[test]
    fn test_count_mismatch() {
        let summary = ResponderSummary {
            setup: SetupMessage { message_size: 4, iterations: 10 },
            handled: 9,
            echoed: 0,
            stopped: true,
        };
        assert_eq!(summary.timed_payloads(), 8);
        assert_eq!(summary.count_mismatch(), Some(10));

        let duration = ResponderSummary {
            setup: SetupMessage { message_size: 4, iterations: 0 },
            ..summary
        };
        assert!(duration.count_mismatch().is_none());
    }

    #[test]
    fn test_initial_state() {
        let (_initiator, responder) = LocalTransport::pair_with_ranks(INITIATOR_RANK, RESPONDER_RANK);
        assert_eq!(Responder::new(responder).state(), ResponderState::AwaitSetup);
    }
}

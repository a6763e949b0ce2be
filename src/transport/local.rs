//! In-process transport connecting two tasks through tokio channels

use super::{ensure_peer, SendHandle, Transport};
use crate::error::{AppError, Result};
use crate::protocol::{INITIATOR_RANK, RESPONDER_RANK};
use crate::types::{Rank, Tag};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
struct Envelope {
    src: Rank,
    tag: Tag,
    payload: Vec<u8>,
    /// Present for rendezvous sends; fired when the receive picks the message up
    ack: Option<oneshot::Sender<()>>,
}

#[derive(Debug)]
pub struct LocalTransport {
    rank: Rank,
    peer: Rank,
    outbox: mpsc::UnboundedSender<Envelope>,
    inbox: mpsc::UnboundedReceiver<Envelope>,
    pending: VecDeque<Envelope>,
    sequence: u64,
}

impl LocalTransport {
    /// Connected initiator and responder endpoints
    pub fn pair() -> (LocalTransport, LocalTransport) {
        Self::pair_with_ranks(INITIATOR_RANK, RESPONDER_RANK)
    }

    pub fn pair_with_ranks(a: Rank, b: Rank) -> (LocalTransport, LocalTransport) {
        let (to_b, from_a) = mpsc::unbounded_channel();
        let (to_a, from_b) = mpsc::unbounded_channel();

        let left = LocalTransport {
            rank: a,
            peer: b,
            outbox: to_b,
            inbox: from_b,
            pending: VecDeque::new(),
            sequence: 0,
        };
        let right = LocalTransport {
            rank: b,
            peer: a,
            outbox: to_a,
            inbox: from_a,
            pending: VecDeque::new(),
            sequence: 0,
        };
        (left, right)
    }

    fn post(&mut self, dest: Rank, tag: Tag, payload: &[u8], ack: Option<oneshot::Sender<()>>) -> Result<u64> {
        ensure_peer(self.peer, dest)?;
        let envelope = Envelope {
            src: self.rank,
            tag,
            payload: payload.to_vec(),
            ack,
        };
        self.outbox
            .send(envelope)
            .map_err(|_| AppError::transport(format!("{} closed its endpoint", self.peer)))?;
        self.sequence += 1;
        Ok(self.sequence)
    }

    fn take_pending(&mut self, src: Rank, tag: Tag) -> Option<Envelope> {
        let position = self
            .pending
            .iter()
            .position(|envelope| envelope.src == src && envelope.tag == tag)?;
        self.pending.remove(position)
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn peer(&self) -> Rank {
        self.peer
    }

    async fn send(&mut self, dest: Rank, tag: Tag, payload: &[u8]) -> Result<()> {
        self.post(dest, tag, payload, None).map(|_| ())
    }

    async fn sync_send(&mut self, dest: Rank, tag: Tag, payload: &[u8]) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.post(dest, tag, payload, Some(ack_tx))?;
        ack_rx.await.map_err(|_| {
            AppError::transport(format!("{} exited before receiving a synchronous send", dest))
        })
    }

    async fn async_send(&mut self, dest: Rank, tag: Tag, payload: &[u8]) -> Result<SendHandle> {
        let sequence = self.post(dest, tag, payload, None)?;
        Ok(SendHandle { sequence })
    }

    async fn recv(&mut self, src: Rank, tag: Tag, buf: &mut Vec<u8>) -> Result<()> {
        ensure_peer(self.peer, src)?;

        let envelope = match self.take_pending(src, tag) {
            Some(envelope) => envelope,
            None => loop {
                let envelope = self.inbox.recv().await.ok_or_else(|| {
                    AppError::transport(format!("{} closed its endpoint", self.peer))
                })?;
                if envelope.src == src && envelope.tag == tag {
                    break envelope;
                }
                self.pending.push_back(envelope);
            },
        };

        if let Some(ack) = envelope.ack {
            // The sender may have given up already; nothing to do then
            let _ = ack.send(());
        }
        *buf = envelope.payload;
        Ok(())
    }
}

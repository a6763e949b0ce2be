//! Message channel between the two endpoints
//!
//! The engine only talks to the [`Transport`] trait, which mirrors the four
//! primitives of a message-passing runtime with rank and tag addressing:
//! buffered send, rendezvous send, fire-and-forget send and blocking receive.

pub mod local;
pub mod tcp;

pub use local::LocalTransport;
pub use tcp::{TcpTransport, MAX_FRAME_SIZE};

use crate::error::{AppError, Result};
use crate::types::{Rank, Tag};
use async_trait::async_trait;

/// Identifies a fire-and-forget send. Completion is never awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendHandle {
    pub sequence: u64,
}

#[async_trait]
pub trait Transport: Send {
    /// Rank of this endpoint
    fn rank(&self) -> Rank;

    /// Rank of the only other endpoint
    fn peer(&self) -> Rank;

    /// Send `payload`; returns once it is buffered locally
    async fn send(&mut self, dest: Rank, tag: Tag, payload: &[u8]) -> Result<()>;

    /// Send `payload`; returns only after the matching receive has started
    async fn sync_send(&mut self, dest: Rank, tag: Tag, payload: &[u8]) -> Result<()>;

    /// Send `payload` without waiting for anything
    async fn async_send(&mut self, dest: Rank, tag: Tag, payload: &[u8]) -> Result<SendHandle>;

    /// Block until a message from `src` with `tag` arrives and move it into `buf`.
    /// Messages with a different source or tag stay queued for later receives.
    async fn recv(&mut self, src: Rank, tag: Tag, buf: &mut Vec<u8>) -> Result<()>;
}

/// Reject addressing anyone but the peer
pub(crate) fn ensure_peer(peer: Rank, requested: Rank) -> Result<()> {
    if requested == peer {
        Ok(())
    } else {
        Err(AppError::transport(format!(
            "{} is not reachable, the only peer is {}",
            requested, peer
        )))
    }
}

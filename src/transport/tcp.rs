//! Two-process transport over a single TCP connection
//!
//! Frame format:
//! ```text
//! +-----------+---------------+---------------+-----------------+
//! | kind (u8) | tag (4 LE)    | length (4 LE) | payload         |
//! +-----------+---------------+---------------+-----------------+
//! ```
//! A `Sync` frame is answered with an `Ack` frame carrying the same tag as soon
//! as the receiving side starts the matching receive. That gives rendezvous
//! semantics for synchronous sends on top of a buffered byte stream.

use super::{ensure_peer, SendHandle, Transport};
use crate::error::{AppError, Result};
use crate::types::{Rank, Tag};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Maximum frame payload (16 MB) to prevent memory exhaustion
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

const HEADER_LEN: usize = 9;
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum FrameKind {
    Data = 0,
    Sync = 1,
    Ack = 2,
}

impl FrameKind {
    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(FrameKind::Data),
            1 => Ok(FrameKind::Sync),
            2 => Ok(FrameKind::Ack),
            other => Err(AppError::protocol(format!("unknown frame kind {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FrameHeader {
    kind: FrameKind,
    tag: Tag,
    len: usize,
}

impl FrameHeader {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.kind as u8);
        out.extend_from_slice(&self.tag.0.to_le_bytes());
        out.extend_from_slice(&(self.len as u32).to_le_bytes());
    }

    fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self> {
        let kind = FrameKind::from_byte(bytes[0])?;
        let tag = Tag(u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]));
        let len = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(AppError::protocol(format!(
                "frame too large: {} bytes (max {} bytes)",
                len, MAX_FRAME_SIZE
            )));
        }
        Ok(Self { kind, tag, len })
    }
}

/// Frame read ahead of the receive that wants it
#[derive(Debug)]
struct QueuedFrame {
    kind: FrameKind,
    tag: Tag,
    payload: Vec<u8>,
}

#[derive(Debug)]
pub struct TcpTransport {
    rank: Rank,
    peer: Rank,
    stream: TcpStream,
    pending: VecDeque<QueuedFrame>,
    out: Vec<u8>,
    sequence: u64,
}

impl TcpTransport {
    /// Bind `address` and wait for the peer to connect
    pub async fn listen(address: &str, rank: Rank, peer: Rank) -> Result<Self> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| AppError::setup(format!("Failed to listen on {}: {}", address, e)))?;
        let (stream, _) = listener
            .accept()
            .await
            .map_err(|e| AppError::setup(format!("Failed to accept peer on {}: {}", address, e)))?;
        Self::establish(stream, rank, peer).await
    }

    /// Connect to a listening peer, retrying until `timeout` elapses
    pub async fn connect(address: &str, rank: Rank, peer: Rank, timeout: Duration) -> Result<Self> {
        let deadline = Instant::now() + timeout;
        loop {
            match TcpStream::connect(address).await {
                Ok(stream) => return Self::establish(stream, rank, peer).await,
                Err(e) if Instant::now() >= deadline => {
                    return Err(AppError::setup(format!(
                        "Failed to connect to {} within {}s: {}",
                        address,
                        timeout.as_secs(),
                        e
                    )));
                }
                Err(_) => tokio::time::sleep(CONNECT_RETRY_INTERVAL).await,
            }
        }
    }

    /// Exchange ranks so two endpoints started with the same rank fail fast
    async fn establish(mut stream: TcpStream, rank: Rank, peer: Rank) -> Result<Self> {
        stream
            .set_nodelay(true)
            .map_err(|e| AppError::setup(format!("Failed to disable Nagle: {}", e)))?;

        stream
            .write_all(&rank.0.to_le_bytes())
            .await
            .map_err(|e| AppError::setup(format!("Rank handshake failed: {}", e)))?;
        let mut announced = [0u8; 4];
        stream
            .read_exact(&mut announced)
            .await
            .map_err(|e| AppError::setup(format!("Rank handshake failed: {}", e)))?;
        let announced = Rank(u32::from_le_bytes(announced));
        if announced != peer {
            return Err(AppError::setup(format!(
                "Peer announced {}, expected {}",
                announced, peer
            )));
        }

        Ok(Self {
            rank,
            peer,
            stream,
            pending: VecDeque::new(),
            out: Vec::new(),
            sequence: 0,
        })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.stream.local_addr()?)
    }

    async fn write_frame(&mut self, kind: FrameKind, tag: Tag, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_FRAME_SIZE {
            return Err(AppError::validation(format!(
                "payload too large: {} bytes (max {} bytes)",
                payload.len(),
                MAX_FRAME_SIZE
            )));
        }
        self.out.clear();
        FrameHeader { kind, tag, len: payload.len() }.encode(&mut self.out);
        self.out.extend_from_slice(payload);
        self.stream
            .write_all(&self.out)
            .await
            .map_err(|e| AppError::transport(format!("write to {} failed: {}", self.peer, e)))?;
        self.sequence += 1;
        Ok(())
    }

    async fn read_header(&mut self) -> Result<FrameHeader> {
        let mut header = [0u8; HEADER_LEN];
        match self.stream.read_exact(&mut header).await {
            Ok(_) => FrameHeader::decode(&header),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(AppError::transport(format!("{} closed the connection", self.peer)))
            }
            Err(e) => Err(AppError::transport(format!("read from {} failed: {}", self.peer, e))),
        }
    }

    async fn read_payload(&mut self, len: usize, buf: &mut Vec<u8>) -> Result<()> {
        buf.clear();
        buf.resize(len, 0);
        self.stream
            .read_exact(buf)
            .await
            .map_err(|e| AppError::transport(format!("read from {} failed: {}", self.peer, e)))?;
        Ok(())
    }

    fn take_pending(&mut self, tag: Tag) -> Option<QueuedFrame> {
        let position = self
            .pending
            .iter()
            .position(|frame| frame.kind != FrameKind::Ack && frame.tag == tag)?;
        self.pending.remove(position)
    }

    /// Acknowledge a synchronous send once its receive has started
    async fn acknowledge(&mut self, kind: FrameKind, tag: Tag) -> Result<()> {
        if kind == FrameKind::Sync {
            self.write_frame(FrameKind::Ack, tag, &[]).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn peer(&self) -> Rank {
        self.peer
    }

    async fn send(&mut self, dest: Rank, tag: Tag, payload: &[u8]) -> Result<()> {
        ensure_peer(self.peer, dest)?;
        self.write_frame(FrameKind::Data, tag, payload).await
    }

    async fn sync_send(&mut self, dest: Rank, tag: Tag, payload: &[u8]) -> Result<()> {
        ensure_peer(self.peer, dest)?;
        self.write_frame(FrameKind::Sync, tag, payload).await?;

        loop {
            let header = self.read_header().await?;
            if header.kind == FrameKind::Ack {
                if header.tag == tag && header.len == 0 {
                    return Ok(());
                }
                return Err(AppError::protocol(format!("unexpected acknowledgement for {}", header.tag)));
            }
            // Peer traffic that overtook the acknowledgement waits for its receive
            let mut payload = Vec::new();
            self.read_payload(header.len, &mut payload).await?;
            self.pending.push_back(QueuedFrame {
                kind: header.kind,
                tag: header.tag,
                payload,
            });
        }
    }

    async fn async_send(&mut self, dest: Rank, tag: Tag, payload: &[u8]) -> Result<SendHandle> {
        ensure_peer(self.peer, dest)?;
        self.write_frame(FrameKind::Data, tag, payload).await?;
        Ok(SendHandle { sequence: self.sequence })
    }

    async fn recv(&mut self, src: Rank, tag: Tag, buf: &mut Vec<u8>) -> Result<()> {
        ensure_peer(self.peer, src)?;

        if let Some(frame) = self.take_pending(tag) {
            *buf = frame.payload;
            return self.acknowledge(frame.kind, tag).await;
        }

        loop {
            let header = self.read_header().await?;
            match header.kind {
                FrameKind::Ack => {
                    return Err(AppError::protocol(format!(
                        "acknowledgement for {} without a synchronous send",
                        header.tag
                    )));
                }
                _ if header.tag == tag => {
                    // Rendezvous point: the matching receive has started
                    self.acknowledge(header.kind, tag).await?;
                    return self.read_payload(header.len, buf).await;
                }
                _ => {
                    let mut payload = Vec::new();
                    self.read_payload(header.len, &mut payload).await?;
                    self.pending.push_back(QueuedFrame {
                        kind: header.kind,
                        tag: header.tag,
                        payload,
                    });
                }
            }
        }
    }
}

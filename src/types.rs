//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Output unit for reported durations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Seconds
    S,
    /// Milliseconds
    Ms,
    /// Microseconds
    Us,
    /// Nanoseconds
    Ns,
}

impl TimeUnit {
    /// Nanoseconds per one unit
    pub fn nanos_per_unit(&self) -> f64 {
        match self {
            TimeUnit::S => 1e9,
            TimeUnit::Ms => 1e6,
            TimeUnit::Us => 1e3,
            TimeUnit::Ns => 1.0,
        }
    }

    /// Smallest precision that still shows nanosecond resolution in this unit
    pub fn default_precision(&self) -> usize {
        match self {
            TimeUnit::S => 9,
            TimeUnit::Ms => 6,
            TimeUnit::Us => 3,
            TimeUnit::Ns => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::S => "s",
            TimeUnit::Ms => "ms",
            TimeUnit::Us => "us",
            TimeUnit::Ns => "ns",
        }
    }
}

impl Default for TimeUnit {
    fn default() -> Self {
        TimeUnit::Us
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "s" | "sec" | "seconds" => Ok(TimeUnit::S),
            "ms" | "millis" | "milliseconds" => Ok(TimeUnit::Ms),
            "us" | "µs" | "micros" | "microseconds" => Ok(TimeUnit::Us),
            "ns" | "nanos" | "nanoseconds" => Ok(TimeUnit::Ns),
            _ => Err(AppError::parse(format!("Invalid unit '{}', expected one of s|ms|us|ns", s))),
        }
    }
}

/// How a single timed iteration exchanges its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExchangeMode {
    /// Rendezvous send; receive time is stamped once the peer started receiving
    OneWay,
    /// Send then wait for the peer to echo the payload back
    Echo,
}

impl ExchangeMode {
    pub fn from_echo_flag(echo: bool) -> Self {
        if echo {
            ExchangeMode::Echo
        } else {
            ExchangeMode::OneWay
        }
    }

    pub fn is_echo(&self) -> bool {
        matches!(self, ExchangeMode::Echo)
    }
}

impl fmt::Display for ExchangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeMode::OneWay => f.write_str("one-way"),
            ExchangeMode::Echo => f.write_str("echo"),
        }
    }
}

/// Endpoint identity on the message channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rank(pub u32);

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rank {}", self.0)
    }
}

/// Message tag used to match sends with receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag(pub u32);

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag {}", self.0)
    }
}

/// Which transport carries the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Both endpoints in this process, connected by in-memory channels
    Local,
    /// One endpoint per process, connected over TCP
    Tcp,
}

impl Default for TransportMode {
    fn default() -> Self {
        TransportMode::Local
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Local => f.write_str("local"),
            TransportMode::Tcp => f.write_str("tcp"),
        }
    }
}

impl FromStr for TransportMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(TransportMode::Local),
            "tcp" => Ok(TransportMode::Tcp),
            _ => Err(AppError::parse(format!("Invalid transport '{}', expected local|tcp", s))),
        }
    }
}

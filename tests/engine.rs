//! Engine tests over a simulated link
//!
//! The link stands in for the responder and moves a shared manual clock by a
//! fixed latency per hop, so pacing and latency results are deterministic.

use async_trait::async_trait;
use pingpong_latency::{
    clock::{ManualClock, Nanos, Timestamp},
    executor::run_initiator,
    models::{RunConfig, Termination},
    protocol::{ControlFlags, SetupMessage, DATA_TAG, INITIATOR_RANK, RESPONDER_RANK, SETUP_TAG},
    transport::{SendHandle, Transport},
    types::{ExchangeMode, Rank, Tag},
    Result,
};
use std::sync::{Arc, Mutex};

/// What the simulated responder saw
#[derive(Debug, Default)]
struct Observed {
    setup: Option<SetupMessage>,
    stop_seen: bool,
}

/// Initiator-side endpoint of a link with a fixed one-way latency
struct SimulatedLink {
    clock: Arc<ManualClock>,
    hop: Nanos,
    /// Every n-th data exchange takes `slow_hop` instead
    slow_every: Option<(u64, Nanos)>,
    exchanges: u64,
    last_payload: Vec<u8>,
    observed: Arc<Mutex<Observed>>,
    sequence: u64,
}

impl SimulatedLink {
    fn new(clock: Arc<ManualClock>, hop: Nanos) -> Self {
        Self {
            clock,
            hop,
            slow_every: None,
            exchanges: 0,
            last_payload: Vec::new(),
            observed: Arc::new(Mutex::new(Observed::default())),
            sequence: 0,
        }
    }

    fn with_slow_hops(mut self, every: u64, slow_hop: Nanos) -> Self {
        self.slow_every = Some((every, slow_hop));
        self
    }

    fn travel(&mut self) {
        let hop = match self.slow_every {
            Some((every, slow)) if self.exchanges % every == every - 1 => slow,
            _ => self.hop,
        };
        self.clock.advance(hop);
    }
}

#[async_trait]
impl Transport for SimulatedLink {
    fn rank(&self) -> Rank {
        INITIATOR_RANK
    }

    fn peer(&self) -> Rank {
        RESPONDER_RANK
    }

    async fn send(&mut self, _dest: Rank, _tag: Tag, payload: &[u8]) -> Result<()> {
        self.last_payload.clear();
        self.last_payload.extend_from_slice(payload);
        self.travel();
        Ok(())
    }

    async fn sync_send(&mut self, _dest: Rank, tag: Tag, payload: &[u8]) -> Result<()> {
        if tag == SETUP_TAG {
            self.observed.lock().unwrap().setup = Some(SetupMessage::decode(payload)?);
            return Ok(());
        }
        self.travel();
        self.exchanges += 1;
        Ok(())
    }

    async fn async_send(&mut self, _dest: Rank, _tag: Tag, payload: &[u8]) -> Result<SendHandle> {
        if ControlFlags::from_payload(payload)?.stop {
            self.observed.lock().unwrap().stop_seen = true;
        }
        self.sequence += 1;
        Ok(SendHandle { sequence: self.sequence })
    }

    async fn recv(&mut self, _src: Rank, tag: Tag, buf: &mut Vec<u8>) -> Result<()> {
        assert_eq!(tag, DATA_TAG);
        self.travel();
        self.exchanges += 1;
        buf.clear();
        buf.extend_from_slice(&self.last_payload);
        Ok(())
    }
}

fn run_config(iterations: u64, mode: ExchangeMode, interval_ns: i64) -> RunConfig {
    RunConfig {
        termination: Termination::Iterations(iterations),
        mode,
        pacing_interval: Nanos::new(interval_ns),
        page_size: 32,
        ..RunConfig::default()
    }
}

fn mean_latency(outcome: &pingpong_latency::RunOutcome) -> f64 {
    let total: i64 = outcome.ledger.iter().map(|s| s.latency().get()).sum();
    total as f64 / outcome.recorded as f64
}

#[tokio::test]
async fn test_echo_latency_exceeds_one_way() {
    let clock = Arc::new(ManualClock::new(Timestamp::ZERO, Nanos::new(100)));
    let link = SimulatedLink::new(clock.clone(), Nanos::new(4_000));
    let one_way = run_initiator(link, run_config(50, ExchangeMode::OneWay, 0), clock, None)
        .await
        .unwrap();

    let clock = Arc::new(ManualClock::new(Timestamp::ZERO, Nanos::new(100)));
    let link = SimulatedLink::new(clock.clone(), Nanos::new(4_000));
    let echo = run_initiator(link, run_config(50, ExchangeMode::Echo, 0), clock, None)
        .await
        .unwrap();

    assert_eq!(one_way.recorded, 50);
    assert_eq!(echo.recorded, 50);
    assert!(mean_latency(&echo) >= mean_latency(&one_way));
    assert!(mean_latency(&echo) >= 8_000.0);
}

#[tokio::test]
async fn test_pacing_mean_interval_matches_target() {
    let interval = 50_000;
    let clock = Arc::new(ManualClock::new(Timestamp::ZERO, Nanos::new(1_000)));
    let link = SimulatedLink::new(clock.clone(), Nanos::new(5_000));
    let outcome = run_initiator(link, run_config(200, ExchangeMode::OneWay, interval), clock, None)
        .await
        .unwrap();

    let sends: Vec<Timestamp> = outcome.ledger.iter().map(|s| s.send_ts).collect();
    let span = (sends[sends.len() - 1] - sends[0]).get() as f64;
    let mean = span / (sends.len() - 1) as f64;
    assert!((mean - interval as f64).abs() <= interval as f64 * 0.01, "mean interval {}", mean);

    // Sends are never early
    for (k, send) in sends.iter().enumerate() {
        assert!((*send - sends[0]).get() >= k as i64 * interval);
    }
}

#[tokio::test]
async fn test_pacing_catches_up_after_slow_exchanges() {
    let interval: i64 = 50_000;
    let slow_hop: i64 = 150_000;
    let clock = Arc::new(ManualClock::new(Timestamp::ZERO, Nanos::new(1_000)));
    let link = SimulatedLink::new(clock.clone(), Nanos::new(5_000)).with_slow_hops(10, Nanos::new(slow_hop));
    let outcome = run_initiator(link, run_config(100, ExchangeMode::OneWay, interval), clock, None)
        .await
        .unwrap();

    let sends: Vec<Timestamp> = outcome.ledger.iter().map(|s| s.send_ts).collect();
    let span = (sends[sends.len() - 1] - sends[0]).get();
    let ideal = (sends.len() as i64 - 1) * interval;

    assert!(span >= ideal);
    assert!(span < ideal + slow_hop + 2 * interval, "span {} ideal {}", span, ideal);
}

#[tokio::test]
async fn test_setup_and_stop_reach_the_link() {
    let clock = Arc::new(ManualClock::new(Timestamp::ZERO, Nanos::new(10)));
    let link = SimulatedLink::new(clock.clone(), Nanos::new(100));
    let observed = link.observed.clone();
    let run = RunConfig {
        termination: Termination::Iterations(7),
        skip: 3,
        message_size: 16,
        ..RunConfig::default()
    };

    let outcome = run_initiator(link, run, clock, None).await.unwrap();
    assert_eq!(outcome.recorded, 10);

    let observed = observed.lock().unwrap();
    let setup = observed.setup.unwrap();
    assert_eq!(setup.iterations, 10);
    assert_eq!(setup.message_size, 16);
    assert!(observed.stop_seen);
}

#[tokio::test]
async fn test_duration_run_reports_only_after_skip() {
    let clock = Arc::new(ManualClock::new(Timestamp::ZERO, Nanos::new(1_000)));
    let link = SimulatedLink::new(clock.clone(), Nanos::new(2_000));
    let run = RunConfig {
        termination: Termination::Duration(Nanos::new(1_000_000)),
        skip: 4,
        pacing_interval: Nanos::new(10_000),
        ..RunConfig::default()
    };

    let outcome = run_initiator(link, run, clock, None).await.unwrap();
    assert!(outcome.recorded > 4);

    let sends: Vec<Timestamp> = outcome.ledger.iter().map(|s| s.send_ts).collect();
    let start = sends[4];
    assert!(sends[4..].iter().all(|send| (*send - start).get() < 1_000_000));
    // 10us pacing over 1ms leaves room for about a hundred reported sends
    let reported = outcome.recorded - 4;
    assert!((95..=101).contains(&reported), "reported {}", reported);
}

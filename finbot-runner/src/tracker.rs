//! The tracking loop.
//!
//! One tick = one captured frame pushed through detector → locator →
//! classifier → market gate → debounce machine, with any committed trade
//! handed to the sink before the next frame is captured. The loop owns every
//! piece of mutable state; nothing is shared across ticks except through it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use finbot_core::data::{
    CaptureError, CircuitBreaker, FrameSource, ImageDirSource, NoQuotes, QuoteSource, SinkAck,
    SinkError, TradeSink, YahooQuoteSource,
};
use finbot_core::domain::{Classification, Frame};
use finbot_core::engine::{DebounceMachine, MachineEvent, TickInput};
use finbot_core::market_hours::MarketSchedule;
use finbot_core::rng::RandomPicker;
use finbot_core::vision::{
    Blob, ColorDetector, ForegroundDetector, MotionDetector, MotionError, ObjectLocator,
};

use crate::config::{CameraConfig, DetectorConfig, QuoteProvider, TrackerConfig};
use crate::sink::build_sink;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("frame capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("foreground detection failed: {0}")]
    Vision(#[from] MotionError),
}

/// What happened on one tick.
#[derive(Debug)]
pub struct TickReport {
    pub at: DateTime<Utc>,
    pub market_open: bool,
    pub blob: Option<Blob>,
    pub classification: Classification,
    pub event: MachineEvent,
    /// Outcome of handing a committed trade to the sink.
    pub delivery: Option<Result<SinkAck, SinkError>>,
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub candidates_started: u64,
    pub candidates_cancelled: u64,
    pub market_resets: u64,
    pub trades_committed: u64,
    pub trades_stored: u64,
    pub sink_failures: u64,
    /// Trades committed without a price.
    pub quote_failures: u64,
}

impl RunSummary {
    pub fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        match &report.event {
            MachineEvent::Started(_) => self.candidates_started += 1,
            MachineEvent::Cancelled { .. } => self.candidates_cancelled += 1,
            MachineEvent::MarketReset { .. } => self.market_resets += 1,
            MachineEvent::Committed(trade) => {
                self.trades_committed += 1;
                if trade.price.is_none() {
                    self.quote_failures += 1;
                }
            }
            MachineEvent::Idle | MachineEvent::MarketClosed | MachineEvent::Waiting { .. } => {}
        }
        match &report.delivery {
            Some(Ok(_)) => self.trades_stored += 1,
            Some(Err(_)) => self.sink_failures += 1,
            None => {}
        }
    }
}

/// Why `run` returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The stop flag was raised.
    Stopped,
    /// `max_frames` ticks completed.
    FrameLimit,
    /// The frame source ran dry.
    FramesExhausted,
    /// Capture or detection failed; the message is the logged error.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub reason: StopReason,
}

/// Loop limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub max_frames: Option<u64>,
    /// Minimum spacing between tick starts; zero runs flat out.
    pub frame_interval: StdDuration,
}

/// Owns the collaborators and the per-run state.
pub struct Tracker {
    frames: Box<dyn FrameSource>,
    detector: Box<dyn ForegroundDetector>,
    locator: ObjectLocator,
    machine: DebounceMachine,
    market: MarketSchedule,
    quotes: Box<dyn QuoteSource>,
    sink: Box<dyn TradeSink>,
    mirror: bool,
}

impl Tracker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        frames: Box<dyn FrameSource>,
        detector: Box<dyn ForegroundDetector>,
        locator: ObjectLocator,
        machine: DebounceMachine,
        market: MarketSchedule,
        quotes: Box<dyn QuoteSource>,
        sink: Box<dyn TradeSink>,
        mirror: bool,
    ) -> Self {
        Self {
            frames,
            detector,
            locator,
            machine,
            market,
            quotes,
            sink,
            mirror,
        }
    }

    /// Wire up every collaborator named by the config.
    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        config.validate().context("config validation failed")?;

        let frames = open_frame_source(&config.camera)?;

        let morphology = config.motion.morphology;
        let detector: Box<dyn ForegroundDetector> = match &config.detector {
            DetectorConfig::Background => {
                Box::new(MotionDetector::new(config.motion.model.clone(), morphology)?)
            }
            DetectorConfig::Color(range) => Box::new(ColorDetector::new(*range, morphology)?),
        };

        let universe = config
            .symbols
            .load()
            .context("loading symbol universe")?;
        let machine = DebounceMachine::new(
            config.decision.dwell(),
            universe,
            Box::new(RandomPicker::new(config.decision.seed)),
        );

        let quotes: Box<dyn QuoteSource> = match config.quotes.provider {
            QuoteProvider::Yahoo => {
                let breaker = Arc::new(CircuitBreaker::default_provider());
                let source = YahooQuoteSource::new(
                    breaker,
                    StdDuration::from_secs(config.quotes.timeout_secs),
                )?
                .with_retries(
                    config.quotes.max_retries,
                    StdDuration::from_millis(config.quotes.retry_delay_ms),
                );
                Box::new(source)
            }
            QuoteProvider::None => Box::new(NoQuotes),
        };

        let sink = build_sink(&config.sink).context("building trade sink")?;

        Ok(Self::new(
            frames,
            detector,
            ObjectLocator::new(config.locator.min_area),
            machine,
            config.market.schedule()?,
            quotes,
            sink,
            config.camera.mirror,
        ))
    }

    pub fn machine(&self) -> &DebounceMachine {
        &self.machine
    }

    pub fn describe(&self) -> String {
        format!(
            "frames={} detector={} quotes={} sink={}",
            self.frames.describe(),
            self.detector.name(),
            self.quotes.name(),
            self.sink.describe()
        )
    }

    /// Run one full tick at `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<TickReport, TickError> {
        let frame = self.frames.capture()?;
        let frame = if self.mirror { frame.mirrored() } else { frame };
        self.process(&frame, now)
    }

    fn process(&mut self, frame: &Frame, now: DateTime<Utc>) -> Result<TickReport, TickError> {
        let mask = self.detector.detect(frame)?;
        let blob = self.locator.locate(&mask);
        let market_open = self.market.is_open(now);

        let input = TickInput::observe(now, market_open, blob.map(|b| b.centroid), frame.width());
        let classification = input.classification;
        let event = self.machine.step(&input, self.quotes.as_ref());

        let delivery = event.trade().map(|trade| {
            let result = self.sink.append(trade);
            match &result {
                Ok(ack) => info!(
                    symbol = %trade.stock,
                    document = ?ack.document_id,
                    sink = %self.sink.describe(),
                    "trade stored"
                ),
                Err(e) => warn!(symbol = %trade.stock, error = %e, "sink write failed, trade not retried"),
            }
            result
        });

        Ok(TickReport {
            at: now,
            market_open,
            blob,
            classification,
            event,
            delivery,
        })
    }

    /// Tick until stopped, out of frames, at the frame limit, or failed.
    ///
    /// `clock` supplies the tick time; `on_tick` sees every report.
    pub fn run(
        &mut self,
        opts: &RunOptions,
        cancel: Option<&AtomicBool>,
        mut clock: impl FnMut() -> DateTime<Utc>,
        on_tick: Option<&dyn Fn(&TickReport)>,
    ) -> RunOutcome {
        info!(tracker = %self.describe(), dwell_ms = self.machine.dwell().num_milliseconds(), "tracking started");
        let mut summary = RunSummary::default();

        let reason = loop {
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                break StopReason::Stopped;
            }
            if opts.max_frames.is_some_and(|max| summary.ticks >= max) {
                break StopReason::FrameLimit;
            }

            let started = Instant::now();
            match self.tick(clock()) {
                Ok(report) => {
                    summary.record(&report);
                    if let Some(cb) = on_tick {
                        cb(&report);
                    }
                }
                Err(TickError::Capture(CaptureError::Exhausted)) => {
                    debug!("frame source exhausted");
                    break StopReason::FramesExhausted;
                }
                Err(e) => {
                    error!(error = %e, "tracking stopped");
                    break StopReason::Failed(e.to_string());
                }
            }

            let spent = started.elapsed();
            if spent < opts.frame_interval {
                std::thread::sleep(opts.frame_interval - spent);
            }
        };

        if let Some(pending) = self.machine.state().candidate() {
            info!(side = %pending.side, symbol = %pending.symbol, "pending candidate dropped at shutdown");
        }
        info!(
            ?reason,
            ticks = summary.ticks,
            started = summary.candidates_started,
            cancelled = summary.candidates_cancelled,
            resets = summary.market_resets,
            committed = summary.trades_committed,
            stored = summary.trades_stored,
            sink_failures = summary.sink_failures,
            quote_failures = summary.quote_failures,
            "tracking finished"
        );
        RunOutcome { summary, reason }
    }
}

/// The live camera when `camera.device` is set, otherwise the image directory.
fn open_frame_source(camera: &CameraConfig) -> Result<Box<dyn FrameSource>> {
    match camera.device {
        Some(index) => open_camera(index, camera),
        None => {
            let source = ImageDirSource::open(&camera.dir)
                .with_context(|| format!("opening frame directory {}", camera.dir.display()))?
                .looping(camera.looping);
            Ok(Box::new(source))
        }
    }
}

#[cfg(all(feature = "camera", target_os = "linux"))]
fn open_camera(index: usize, camera: &CameraConfig) -> Result<Box<dyn FrameSource>> {
    let source = finbot_core::data::CameraSource::open(index, camera.width, camera.height)
        .with_context(|| format!("opening camera /dev/video{index}"))?;
    Ok(Box::new(source))
}

#[cfg(not(all(feature = "camera", target_os = "linux")))]
fn open_camera(index: usize, _camera: &CameraConfig) -> Result<Box<dyn FrameSource>> {
    anyhow::bail!(
        "/dev/video{index}: live capture needs a Linux build with the `camera` feature"
    )
}

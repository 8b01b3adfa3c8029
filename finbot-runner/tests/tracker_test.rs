//! Tracker integration tests: scripted frames and fake collaborators
//! through the full tick loop.

use std::cell::Cell;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use finbot_core::data::{
    NoQuotes, ScriptedFrames, SinkAck, SinkError, StaticQuotes, SymbolUniverse, TradeSink,
};
use finbot_core::domain::{Classification, CommittedTrade, Frame, Side};
use finbot_core::engine::{DebounceMachine, MachineEvent};
use finbot_core::market_hours::{MarketHours, MarketSchedule};
use finbot_core::rng::SequencePicker;
use finbot_core::vision::{ColorDetector, HsvRange, Morphology, ObjectLocator};
use finbot_runner::{JsonlSink, RunOptions, StopReason, TickReport, Tracker, TrackerConfig};

const W: u32 = 160;
const H: u32 = 120;
const BLUE: [u8; 3] = [0, 0, 255];
const ORANGE: [u8; 3] = [255, 128, 0];

// ── Helpers ──────────────────────────────────────────────────────────

fn scene(fish_x: Option<u32>) -> Frame {
    let mut data = Vec::with_capacity((W * H * 3) as usize);
    for y in 0..H {
        for x in 0..W {
            let inside = fish_x.is_some_and(|x0| (x0..x0 + 40).contains(&x) && (40..80).contains(&y));
            data.extend_from_slice(if inside { &ORANGE } else { &BLUE });
        }
    }
    Frame::from_raw(W, H, data).unwrap()
}

/// Sink that shares its log with the test.
#[derive(Clone, Default)]
struct SharedSink {
    trades: Arc<Mutex<Vec<CommittedTrade>>>,
}

impl TradeSink for SharedSink {
    fn describe(&self) -> String {
        "shared".into()
    }

    fn append(&mut self, trade: &CommittedTrade) -> Result<SinkAck, SinkError> {
        self.trades.lock().unwrap().push(trade.clone());
        Ok(SinkAck::default())
    }
}

struct BrokenSink;

impl TradeSink for BrokenSink {
    fn describe(&self) -> String {
        "broken".into()
    }

    fn append(&mut self, _trade: &CommittedTrade) -> Result<SinkAck, SinkError> {
        Err(SinkError::Unreachable("connection refused".into()))
    }
}

fn tracker(
    frames: Vec<Frame>,
    market: MarketSchedule,
    sink: Box<dyn TradeSink>,
    mirror: bool,
) -> Tracker {
    let universe = SymbolUniverse::new(["AAPL", "MSFT"]).unwrap();
    Tracker::new(
        Box::new(ScriptedFrames::new(frames)),
        Box::new(ColorDetector::new(HsvRange::default(), Morphology::default()).unwrap()),
        ObjectLocator::default(),
        DebounceMachine::new(
            Duration::seconds(5),
            universe,
            Box::new(SequencePicker::new(vec![0, 1])),
        ),
        market,
        Box::new(StaticQuotes::new().with_price("AAPL", 190.0)),
        sink,
        mirror,
    )
}

/// Wednesday 2024-07-10 11:00 New York.
fn session_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 10, 15, 0, 0).unwrap()
}

/// A clock that advances one second per tick.
fn stepping_clock(start: DateTime<Utc>) -> impl FnMut() -> DateTime<Utc> {
    let mut n = -1;
    move || {
        n += 1;
        start + Duration::seconds(n)
    }
}

fn flat_out(max_frames: Option<u64>) -> RunOptions {
    RunOptions {
        max_frames,
        frame_interval: StdDuration::ZERO,
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[test]
fn steady_fish_on_left_commits_one_buy() {
    let sink = SharedSink::default();
    let frames = (0..8).map(|_| scene(Some(10))).collect();
    let mut t = tracker(frames, MarketSchedule::AlwaysOpen, Box::new(sink.clone()), false);

    let outcome = t.run(&flat_out(None), None, stepping_clock(session_start()), None);

    assert_eq!(outcome.reason, StopReason::FramesExhausted);
    assert_eq!(outcome.summary.ticks, 8);
    assert_eq!(outcome.summary.trades_committed, 1);
    assert_eq!(outcome.summary.trades_stored, 1);
    // tick 6 restarts a fresh candidate after the commit on tick 5
    assert_eq!(outcome.summary.candidates_started, 2);

    let trades = sink.trades.lock().unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].decision, Side::Buy);
    assert_eq!(trades[0].stock, "AAPL");
    assert_eq!(trades[0].price, Some(190.0));
    assert_eq!(trades[0].timestamp, session_start() + Duration::seconds(5));
    assert_eq!(trades[0].canvas_width, W);
}

#[test]
fn mirror_flips_the_decision() {
    let sink = SharedSink::default();
    let frames = (0..6).map(|_| scene(Some(10))).collect();
    let mut t = tracker(frames, MarketSchedule::AlwaysOpen, Box::new(sink.clone()), true);

    t.run(&flat_out(None), None, stepping_clock(session_start()), None);

    let trades = sink.trades.lock().unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].decision, Side::Sell);
}

#[test]
fn fish_leaving_cancels_candidate() {
    let sink = SharedSink::default();
    let mut frames = vec![scene(Some(10)), scene(Some(10)), scene(None)];
    frames.extend((0..4).map(|_| scene(Some(10))));
    let mut t = tracker(frames, MarketSchedule::AlwaysOpen, Box::new(sink.clone()), false);

    let outcome = t.run(&flat_out(None), None, stepping_clock(session_start()), None);

    assert_eq!(outcome.summary.candidates_cancelled, 1);
    assert_eq!(outcome.summary.trades_committed, 0);
    assert!(sink.trades.lock().unwrap().is_empty());
}

#[test]
fn fish_crossing_midline_commits_starting_side() {
    let sink = SharedSink::default();
    let mut frames = vec![scene(Some(10)), scene(Some(10))];
    frames.extend((0..4).map(|_| scene(Some(110))));
    let mut t = tracker(frames, MarketSchedule::AlwaysOpen, Box::new(sink.clone()), false);

    let outcome = t.run(&flat_out(None), None, stepping_clock(session_start()), None);

    assert_eq!(outcome.summary.candidates_cancelled, 0);
    assert_eq!(outcome.summary.trades_committed, 1);
    let trades = sink.trades.lock().unwrap();
    assert_eq!(trades[0].decision, Side::Buy);
    assert_eq!(trades[0].timestamp, session_start() + Duration::seconds(5));
    // position comes from the committing tick, right of the midline
    assert!(trades[0].position_x >= W / 2);
}

#[test]
fn closed_market_never_trades() {
    let sink = SharedSink::default();
    let frames = (0..10).map(|_| scene(Some(110))).collect();
    let mut t = tracker(
        frames,
        MarketSchedule::Exchange(MarketHours::nyse()),
        Box::new(sink.clone()),
        false,
    );
    // Saturday
    let saturday = Utc.with_ymd_and_hms(2024, 7, 13, 15, 0, 0).unwrap();

    let outcome = t.run(&flat_out(None), None, stepping_clock(saturday), None);

    assert_eq!(outcome.summary.ticks, 10);
    assert_eq!(outcome.summary.candidates_started, 0);
    assert_eq!(outcome.summary.trades_committed, 0);
    assert!(t.machine().state().is_idle());
}

#[test]
fn close_while_pending_resets() {
    let frames = (0..4).map(|_| scene(Some(110))).collect();
    let mut t = tracker(
        frames,
        MarketSchedule::Exchange(MarketHours::nyse()),
        Box::new(SharedSink::default()),
        false,
    );
    // 15:59:58 New York (EDT = UTC-4); 16:00:01 onwards is closed
    let start = Utc.with_ymd_and_hms(2024, 7, 10, 19, 59, 58).unwrap();

    let outcome = t.run(&flat_out(None), None, stepping_clock(start), None);

    assert_eq!(outcome.summary.candidates_started, 1);
    assert_eq!(outcome.summary.market_resets, 1);
    assert_eq!(outcome.summary.trades_committed, 0);
}

#[test]
fn sink_failure_is_counted_not_fatal() {
    let frames = (0..12).map(|_| scene(Some(10))).collect();
    let mut t = tracker(frames, MarketSchedule::AlwaysOpen, Box::new(BrokenSink), false);

    let outcome = t.run(&flat_out(None), None, stepping_clock(session_start()), None);

    assert_eq!(outcome.reason, StopReason::FramesExhausted);
    assert_eq!(outcome.summary.trades_committed, 2);
    assert_eq!(outcome.summary.sink_failures, 2);
    assert_eq!(outcome.summary.trades_stored, 0);
}

#[test]
fn quote_failure_commits_without_price() {
    let sink = SharedSink::default();
    let universe = SymbolUniverse::new(["ZZZZ"]).unwrap();
    let mut t = Tracker::new(
        Box::new(ScriptedFrames::new((0..6).map(|_| scene(Some(10))))),
        Box::new(ColorDetector::new(HsvRange::default(), Morphology::default()).unwrap()),
        ObjectLocator::default(),
        DebounceMachine::new(
            Duration::seconds(5),
            universe,
            Box::new(SequencePicker::new(vec![0])),
        ),
        MarketSchedule::AlwaysOpen,
        Box::new(NoQuotes),
        Box::new(sink.clone()),
        false,
    );

    let outcome = t.run(&flat_out(None), None, stepping_clock(session_start()), None);

    assert_eq!(outcome.summary.quote_failures, 1);
    assert_eq!(sink.trades.lock().unwrap()[0].price, None);
}

#[test]
fn frame_limit_and_stop_flag() {
    let frames: Vec<Frame> = (0..20).map(|_| scene(None)).collect();
    let mut t = tracker(frames.clone(), MarketSchedule::AlwaysOpen, Box::new(SharedSink::default()), false);
    let outcome = t.run(&flat_out(Some(3)), None, stepping_clock(session_start()), None);
    assert_eq!(outcome.reason, StopReason::FrameLimit);
    assert_eq!(outcome.summary.ticks, 3);

    let stop = AtomicBool::new(true);
    let mut t = tracker(frames, MarketSchedule::AlwaysOpen, Box::new(SharedSink::default()), false);
    let outcome = t.run(&flat_out(None), Some(&stop), stepping_clock(session_start()), None);
    assert_eq!(outcome.reason, StopReason::Stopped);
    assert_eq!(outcome.summary.ticks, 0);
}

#[test]
fn frame_size_change_stops_the_run() {
    let mut t = Tracker::new(
        Box::new(ScriptedFrames::new(vec![
            Frame::solid(64, 48, [10, 10, 10]),
            Frame::solid(32, 24, [10, 10, 10]),
        ])),
        Box::new(
            finbot_core::vision::MotionDetector::new(Default::default(), Morphology::default())
                .unwrap(),
        ),
        ObjectLocator::default(),
        DebounceMachine::new(
            Duration::seconds(5),
            SymbolUniverse::default_us(),
            Box::new(SequencePicker::new(vec![0])),
        ),
        MarketSchedule::AlwaysOpen,
        Box::new(NoQuotes),
        Box::new(SharedSink::default()),
        false,
    );
    let outcome = t.run(&flat_out(None), None, stepping_clock(session_start()), None);
    assert!(matches!(outcome.reason, StopReason::Failed(ref m) if m.contains("background model")));
    assert_eq!(outcome.summary.ticks, 1);
}

#[test]
fn on_tick_sees_every_report() {
    let seen = Cell::new(0u32);
    let buys = Cell::new(0u32);
    let cb: &dyn Fn(&TickReport) = &|r: &TickReport| {
        seen.set(seen.get() + 1);
        if r.classification == Classification::Buy {
            buys.set(buys.get() + 1);
        }
        if let MachineEvent::Committed(trade) = &r.event {
            assert!(r.delivery.as_ref().is_some_and(|d| d.is_ok()));
            assert_eq!(trade.decision, Side::Buy);
        }
    };
    let frames = vec![scene(None), scene(Some(10)), scene(Some(10))];
    let mut t = tracker(frames, MarketSchedule::AlwaysOpen, Box::new(SharedSink::default()), false);
    t.run(&flat_out(None), None, stepping_clock(session_start()), Some(cb));
    assert_eq!(seen.get(), 3);
    assert_eq!(buys.get(), 2);
}

fn write_frames(dir: &Path, frames: &[Frame]) {
    for (i, frame) in frames.iter().enumerate() {
        frame
            .image()
            .save(dir.join(format!("frame_{i:04}.png")))
            .unwrap();
    }
}

#[test]
fn from_config_runs_against_image_directory() {
    let tmp = TempDir::new().unwrap();
    let frames_dir = tmp.path().join("frames");
    std::fs::create_dir_all(&frames_dir).unwrap();
    write_frames(&frames_dir, &(0..7).map(|_| scene(Some(110))).collect::<Vec<_>>());
    let symbols = tmp.path().join("symbols.csv");
    std::fs::write(&symbols, "Symbol,Name\nKO,Coca-Cola\n").unwrap();
    let trades = tmp.path().join("out/trades.jsonl");

    let toml = format!(
        r#"
        [camera]
        dir = "{}"
        frame_interval_ms = 0

        [detector]
        mode = "color"

        [decision]
        seed = 1

        [market]
        gate = "always_open"

        [symbols]
        path = "{}"

        [quotes]
        provider = "none"

        [sink]
        kind = "jsonl"
        path = "{}"
        "#,
        frames_dir.display(),
        symbols.display(),
        trades.display()
    );
    let config = TrackerConfig::from_toml(&toml).unwrap();
    let mut t = Tracker::from_config(&config).unwrap();
    assert!(t.describe().contains("detector=color"));

    let outcome = t.run(
        &RunOptions {
            max_frames: config.camera.max_frames,
            frame_interval: config.camera.frame_interval(),
        },
        None,
        stepping_clock(session_start()),
        None,
    );

    assert_eq!(outcome.reason, StopReason::FramesExhausted);
    assert_eq!(outcome.summary.trades_committed, 1);

    let stored = JsonlSink::new(trades).read_all().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].decision, Side::Sell);
    assert_eq!(stored[0].stock, "KO");
    assert_eq!(stored[0].price, None);
}

#[test]
fn from_config_rejects_missing_frame_directory() {
    let config = TrackerConfig::from_toml("[camera]\ndir = \"/no/such/frames\"\n").unwrap();
    let err = Tracker::from_config(&config).err().unwrap();
    assert!(format!("{err:#}").contains("/no/such/frames"));
}

#[test]
fn from_config_reports_unopenable_camera() {
    let config = TrackerConfig::from_toml("[camera]\ndevice = 99\n").unwrap();
    let err = Tracker::from_config(&config).err().unwrap();
    assert!(format!("{err:#}").contains("/dev/video99"));
}

//! Property tests for run-summary accounting.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use finbot_core::data::{MemorySink, ScriptedFrames, StaticQuotes, SymbolUniverse};
use finbot_core::domain::Frame;
use finbot_core::engine::DebounceMachine;
use finbot_core::market_hours::MarketSchedule;
use finbot_core::rng::RandomPicker;
use finbot_core::vision::{ColorDetector, HsvRange, Morphology, ObjectLocator};
use finbot_runner::{RunOptions, StopReason, Tracker};

const W: u32 = 96;
const H: u32 = 64;
const FISH: [u8; 3] = [255, 128, 0];
const WATER: [u8; 3] = [0, 0, 255];

/// Blue frame, optionally with a 30x30 orange square at `x0`.
fn scene(fish_x: Option<u32>) -> Frame {
    let mut data = Vec::with_capacity((W * H * 3) as usize);
    for y in 0..H {
        for x in 0..W {
            let inside =
                fish_x.is_some_and(|x0| (x0..x0 + 30).contains(&x) && (17..47).contains(&y));
            data.extend_from_slice(if inside { &FISH } else { &WATER });
        }
    }
    Frame::from_raw(W, H, data).unwrap()
}

fn arb_scene() -> impl Strategy<Value = Option<u32>> {
    prop_oneof![Just(None), Just(Some(4)), Just(Some(60))]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn summary_accounting_is_consistent(
        scenes in prop::collection::vec(arb_scene(), 0..30),
        seed in any::<u64>(),
        step_ms in 200i64..3000,
    ) {
        let n = scenes.len() as u64;
        let mut tracker = Tracker::new(
            Box::new(ScriptedFrames::new(scenes.into_iter().map(scene))),
            Box::new(ColorDetector::new(HsvRange::default(), Morphology::default()).unwrap()),
            ObjectLocator::new(400),
            DebounceMachine::new(
                Duration::seconds(5),
                SymbolUniverse::new(["AAPL", "MSFT"]).unwrap(),
                Box::new(RandomPicker::seeded(seed)),
            ),
            MarketSchedule::AlwaysOpen,
            Box::new(StaticQuotes::new().with_price("AAPL", 1.0)),
            Box::new(MemorySink::default()),
            false,
        );
        let start = Utc.with_ymd_and_hms(2024, 7, 10, 15, 0, 0).unwrap();
        let mut i = -1;
        let clock = move || {
            i += 1;
            start + Duration::milliseconds(i * step_ms)
        };

        let outcome = tracker.run(&RunOptions::default(), None, clock, None);
        let s = outcome.summary;

        prop_assert_eq!(outcome.reason, StopReason::FramesExhausted);
        prop_assert_eq!(s.ticks, n);
        prop_assert_eq!(s.trades_committed, s.trades_stored + s.sink_failures);
        prop_assert!(s.trades_committed + s.candidates_cancelled <= s.candidates_started);
        prop_assert!(s.candidates_started <= s.trades_committed + s.candidates_cancelled + 1);
        prop_assert_eq!(s.market_resets, 0);
    }
}

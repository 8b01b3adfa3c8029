//! Collaborator boundaries and their adapters.
//!
//! Each external collaborator gets a trait plus a structured error type so the
//! tracking loop can tell the failure kinds apart:
//! - `FrameSource` / `CaptureError`: fatal for the run
//! - `QuoteSource` / `QuoteError`: recovered as a missing price
//! - `TradeSink` / `SinkError`: logged, never retried

pub mod camera;
pub mod circuit_breaker;
pub mod frames;
pub mod provider;
pub mod sink;
pub mod universe;
pub mod yahoo;

#[cfg(all(feature = "camera", target_os = "linux"))]
pub use camera::CameraSource;
pub use camera::PixelFormat;
pub use circuit_breaker::CircuitBreaker;
pub use frames::{CaptureError, FrameSource, ImageDirSource, ScriptedFrames};
pub use provider::{NoQuotes, QuoteError, QuoteSource, StaticQuotes};
pub use sink::{MemorySink, SinkAck, SinkError, TradeSink};
pub use universe::{SymbolUniverse, UniverseError};
pub use yahoo::YahooQuoteSource;

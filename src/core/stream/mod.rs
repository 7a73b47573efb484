//! Incremental decoding of streamed chat replies.
//!
//! Raw body bytes flow through [`splitter::FrameSplitter`] into
//! [`dialect::Dialect::decode`], the decoded deltas are collected by
//! [`aggregator::DeltaAggregator`], and [`detector::CompletionDetector`]
//! decides when the turn is over. [`orchestrator::StreamOrchestrator`] runs
//! that pipeline one frame at a time and yields a single
//! [`orchestrator::StreamOutcome`].

pub mod aggregator;
pub mod detector;
pub mod dialect;
pub mod error;
pub mod orchestrator;
pub mod splitter;

pub use aggregator::{DeltaAggregator, DeltaCallback};
pub use detector::{CompletionDetector, DetectorState};
pub use dialect::{DecodedFrame, Delta, Dialect, EndSignal};
pub use error::{CallbackError, DecodeError, StreamError, StreamFailure};
pub use orchestrator::{StreamOrchestrator, StreamOutcome, DEFAULT_BUFFER_SIZE};
pub use splitter::{Frame, FrameSplitter};

//! Segment-sequencing timer: the synchronous engine, the per-segment
//! timeline and the async controller that drives both.

pub mod controller;
pub mod state;
pub mod timeline;

pub use controller::{TickSource, TimerController, TimerEvent, TimerSnapshot};
pub use state::{SegmentTransition, StoppedRun, TickOutcome, TimerState, TimerStatus};
pub use timeline::TimelineRecorder;

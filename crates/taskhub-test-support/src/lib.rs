//! Shared test handlers, clocks and event builders for Taskhub.

mod clock;
mod events;
mod handlers;

pub use clock::FixedClock;
pub use events::{fixed_time, payload_for, sample_event, sample_event_at, sample_event_for};
pub use handlers::{FailingHandler, FlakyHandler, PanickingHandler, RecordingHandler, SlowHandler};

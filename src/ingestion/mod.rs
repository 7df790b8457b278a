//! Frame Ingestion
//!
//! Turns raw sensor text into stored `Frame`s and `Alert`s.
//!
//! - [`FrameIngestor::process_frame`]: one frame, errors returned to the caller
//! - [`FrameIngestor::process_batch`]: a multi-frame upload with per-frame fault isolation

mod batch;
mod clock;
mod pipeline;

pub use batch::{infer_base_timestamp, split_frames};
pub use clock::{Clock, FixedClock, SystemClock};
pub use pipeline::{FrameIngestor, IngestError, PendingFrame};

//! Shared data structures for foot-pressure frame analysis
//!
//! - `Frame`: one analysed, persisted sensor reading
//! - `Alert`: raised when a frame reaches `RiskLevel::High`
//! - `BatchUploadResult`: per-call summary of a multi-frame upload

mod alert;
mod batch;
mod frame;

pub use alert::*;
pub use batch::*;
pub use frame::*;

//! Plantar Sentinel: foot-pressure frame analysis and alerting
//!
//! Turns raw pressure-mat readings into scored, persisted frames and raises
//! alerts for dangerous ones.
//!
//! ## Architecture
//!
//! - **Analysis**: grid parsing, noise-filtered peak, contact area, risk bands
//! - **Ingestion**: single-frame pipeline and multi-frame batch uploads
//! - **Storage**: `FrameStore` backends with atomic frame + alert writes
//! - **API**: Axum HTTP surface over ingestion and read-back

pub mod analysis;
pub mod api;
pub mod config;
pub mod ingestion;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::EngineConfig;

// Re-export commonly used types
pub use types::{
    Alert, AlertStatus, BatchStatus, BatchUploadResult, Frame, PatientId, RiskLevel,
};

// Re-export analysis entry points
pub use analysis::{analyze_frame, FrameAnalysis, MalformedGrid};

// Re-export ingestion
pub use ingestion::{Clock, FixedClock, FrameIngestor, IngestError, SystemClock};

// Re-export storage
pub use storage::{FrameStore, InMemoryFrameStore, PersistenceError, SledFrameStore};

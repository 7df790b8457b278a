//! Frame and alert persistence
//!
//! Every backend implements [`FrameStore`], whose `save` writes a frame and
//! its optional alert as one unit.
//!
//! - [`InMemoryFrameStore`]: tests and throwaway runs
//! - [`SledFrameStore`]: embedded on-disk store used by the service

pub mod persistence;
pub mod sled_store;

pub use persistence::{FrameStore, InMemoryFrameStore, PersistenceError};
pub use sled_store::SledFrameStore;

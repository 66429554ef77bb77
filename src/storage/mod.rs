//! Storage session facade.
//!
//! [`StegoStorage`] is the single entry point for callers: it owns the
//! configuration, the carrier pool while it is being opened, and the virtual
//! storage once loaded.

mod session;

pub use session::{StegoStorage, StorageInfo};

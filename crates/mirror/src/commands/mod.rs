//! CLI command implementations.

pub(crate) mod status;
pub(crate) mod sync;

pub(crate) use status::StatusArgs;
pub(crate) use sync::SyncArgs;

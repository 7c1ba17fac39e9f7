//! Periodic reporting of group sync state.

pub mod reporter;

pub use reporter::{Callback, Reporter, Snapshot};

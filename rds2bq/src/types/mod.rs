//! Common types used throughout the export and transfer pipeline.
//!
//! Groups snapshot and export task types, export metadata documents, warehouse
//! identities and transfer configuration types.

mod export;
mod snapshot;
mod transfer;
mod warehouse;

pub use export::*;
pub use snapshot::*;
pub use transfer::*;
pub use warehouse::*;

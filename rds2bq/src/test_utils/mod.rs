//! In-memory implementations of the remote collaborators for tests.
//!
//! Every double records the calls it receives so tests can assert call counts and
//! idempotency. [`warehouse::MemoryWarehouse`] also supports injecting failures for
//! individual transfer configurations.

pub mod secrets;
pub mod snapshot;
pub mod storage;
pub mod warehouse;

//! Derived views over normalized ingest output.
//!
//! Submodules:
//! - `current_state` - reduces a gauge station's series to one summary.

pub mod current_state;

//! Shared data model for uCT knee OA geometric indices.

mod types;

pub use types::*;

//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Monotonic integer timestamps in nanoseconds (`i64`) as the primary clock
//! - Ordering is total by timestamp; ties are broken by arrival order

mod config;
mod engine;
mod error;
mod sensor;
mod sync;
mod transform;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use sensor::*;
pub use sync::*;
pub use transform::*;

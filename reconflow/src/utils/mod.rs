//! Utility helpers shared across modules.

mod timestamps;

pub use timestamps::{iso_timestamp, Timestamp};

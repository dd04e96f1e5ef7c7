//! Test and simulation support.
//!
//! Compiled into the crate proper so integration tests and embedders'
//! simulations can share it: scripted stage tasks that replay canned
//! state sequences, a factory handing them out, and seeding helpers for
//! [`MemoryStore`](crate::store::MemoryStore).

mod fixtures;
mod tasks;

pub use fixtures::{
    geographic_photogroup, nadir_photogroup, photo_at, register_chain, seed_survey,
    unpositioned_photo, SurveySeed,
};
pub use tasks::{ScriptedFactory, ScriptedTask};

//! drillplan-core: practice scheduling engine, traits, and progress metrics.
//!
//! This crate defines the data model, the collaborator traits for records and
//! the item catalog, and the pipeline that turns a learner's answer history
//! into the next practice session.

pub mod allocator;
pub mod bucket;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod model;
pub mod profile;
pub mod progress;
pub mod range;
pub mod scorer;
pub mod scoresheet;
pub mod sequencer;
pub mod subject;
pub mod traits;
pub mod tuning;

#[cfg(test)]
mod testing;

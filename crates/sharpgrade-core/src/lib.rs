//! sharpgrade-core: Normalizer, evaluator engine, and scoring.
//!
//! This crate defines the data model, the source normalizer, the compiler
//! traits, and the evaluation loop that the rest of sharpgrade builds on.

pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod report;
pub mod results;
pub mod traits;

//! Builders to construct scheduler instances from configuration.

mod arbiter_builder;

pub use arbiter_builder::ArbiterBuilder;

//! Core trait definitions.

pub mod factory;

pub use factory::HandleFactory;

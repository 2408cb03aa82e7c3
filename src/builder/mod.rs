//! Builders that construct canonical representations bottom-up

pub mod sdd_builder;

pub use sdd_builder::{SddManager, SddStats};

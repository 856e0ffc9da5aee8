//! Core domain models for Pipeline
//!
//! This module defines the pipeline definition, its YAML configuration
//! source, per-step environment layering, and run state.

pub mod config;
pub mod environment;
pub mod pipeline;
pub mod state;

pub use environment::EffectiveEnvironment;
pub use pipeline::*;
pub use state::*;

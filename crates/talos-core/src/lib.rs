//! # talos-core
//!
//! Core types and primitives for the Talos chatops framework.
//! This crate defines the shared vocabulary used by every other crate in the workspace:
//! the error type, the `Message` exchanged with channels, and the parameter/pattern
//! types that flow between matchers, parsers and skills.

pub mod error;
pub mod message;
pub mod types;

pub use error::{Result, TalosError};
pub use message::Message;
pub use types::{ExtractionPatterns, Params};

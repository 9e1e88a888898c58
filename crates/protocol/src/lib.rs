//! # hk-protocol
//!
//! Wire-level data models shared between the hivekit runtime and the
//! transport adapters that carry its events to other processes.
//!
//! This crate defines all shared data structures used for:
//! - Correlating events with the run that produced them
//! - Reporting run lifecycle status
//! - Shipping delivered events and structured errors over a transport
//! - The minimal chat message exchanged at the model boundary
//!
//! ## Modules
//!
//! - [`event_models`]: Event traces and serialized event records
//! - [`run_models`]: Run lifecycle status
//! - [`error_models`]: Structured error reports
//! - [`message_models`]: Chat messages and roles
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, ts-rs, uuid and chrono
//! - TypeScript generation: All types derive `TS` for client compatibility
//! - Independent compilation: No dependencies on other hivekit crates

pub mod error_models;
pub mod event_models;
pub mod message_models;
pub mod run_models;

// Re-export all public types for convenience
pub use error_models::*;
pub use event_models::*;
pub use message_models::*;
pub use run_models::*;

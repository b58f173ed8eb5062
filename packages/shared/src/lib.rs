//! Shared types for the Parlor real-time layer.
//!
//! This crate holds the wire vocabulary exchanged with the event-stream
//! server, the domain records those events carry, and the small utilities
//! (time, logging setup) used by every consumer of the protocol.

pub mod logger;
pub mod model;
pub mod protocol;
pub mod time;

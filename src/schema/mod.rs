//! Backend payload schema
//!
//! This module defines the wire shapes the system of record exchanges with
//! the client, and the adapter that normalizes them into core types.

mod adapter;
mod raw_cycle;

pub use adapter::*;
pub use raw_cycle::*;

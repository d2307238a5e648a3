//! Native messaging host for the scene batch extension.
//!
//! The host owns the workflow state, drives the dispatch timer and talks to
//! the extension through length-prefixed JSON frames on stdin/stdout.
pub mod bridge;
pub mod config;
pub mod coordinator;
pub mod effects;
pub mod logging;
pub mod persistence;
pub mod wire;

pub use coordinator::{Clock, Coordinator, CoordinatorParts, HostEvent};

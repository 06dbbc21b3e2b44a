//! Traversal orchestration for personlink.
//!
//! This crate ties page fetching, biography extraction and persistence into
//! the connection traversal, and carries the listener pipeline that reports
//! its progress.

pub mod events;
pub mod listeners;
pub mod traversal;

pub use events::{EventPipeline, ListenerEvent, ListenerFailure, ListenerId, TraversalListener};
pub use listeners::{DbInsertListener, PersonRepository};
pub use traversal::{ChainOutcome, ChainStop, ConnectionTraversal, TraversalOutcome};

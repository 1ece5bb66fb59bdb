//! # Tracker
//!
//! Mock implementation of the tracking engine boundary plus map-folder
//! validation.
//!
//! The real visual/inertial engine is an external binary collaborator; this
//! crate provides a scripted stand-in that honors the same calling contract,
//! including the deferred completion behavior of map operations: `save_map`
//! and `localize` return immediately and their completions fire during a
//! later `track` call, the way the real engine resolves map work on its
//! processing thread.

pub mod map_folder;
mod mock;

pub use mock::{CompletionMode, MockEngine, MockEngineConfig, MockEngineFactory, MockState};

//! The single-threaded runtime and the handle that drives it.
//!
//! - [`executor`] - [`DatacubesApp`], owner of the graph and every task
//! - [`bridge`] - [`AppBridge`], commands in and messages out

pub mod bridge;
pub mod executor;

pub use bridge::{AppBridge, AppCommand, AppMessage, SceneSnapshot};
pub use executor::DatacubesApp;

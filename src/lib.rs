//! Prompt-to-page generation with live section tracking and in-place
//! component regeneration.

pub mod cli;
pub mod config;
pub mod editor;
pub mod errors;
pub mod generate;
pub mod instruct;
pub mod log;
pub mod mutation;
pub mod progress;
pub mod prompt;
pub mod provider;
pub mod sanitize;
pub mod server;
pub mod session;
pub mod ux;
pub mod wire;

pub use errors::{Result, WebmindError};

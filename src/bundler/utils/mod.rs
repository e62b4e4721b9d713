//! Shared helpers: external commands, filesystem operations and progress display.

pub mod command;
pub mod fs;
pub mod progress;

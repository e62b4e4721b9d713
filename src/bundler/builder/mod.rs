//! Bundle orchestration and coordination.
//!
//! This module provides the main [`Bundler`] orchestrator that turns
//! [`Settings`](crate::bundler::Settings) into artifacts.
//!
//! # Overview
//!
//! The bundler:
//! 1. Determines which package types to create
//! 2. Delegates to the macOS platform modules
//! 3. Calculates size and checksum of each artifact
//! 4. Returns [`BundledArtifact`](crate::bundler::BundledArtifact) results
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA256 checksum calculation for artifacts
//! - [`orchestrator`] - Main [`Bundler`] struct and bundling operations
//! - [`signing`] - Developer ID validation
//! - [`tool_detection`] - External tool availability checking

pub mod checksum;
mod orchestrator;
pub mod signing;
pub mod tool_detection;

pub use orchestrator::Bundler;

// SPDX-License-Identifier: MPL-2.0

//! Viewfinder - a single-screen camera for the terminal
//!
//! This library provides the core functionality for the Viewfinder application:
//! camera binding, a live half-block preview, tap-to-focus, zoom, torch and
//! JPEG capture into a timestamped photo directory.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Screen controller (model, messages, handlers) and rendering
//! - [`backends`]: Camera backend abstraction (V4L2 and a test pattern)
//! - [`pipelines`]: Still capture executor and JPEG encoding
//! - [`config`]: User configuration handling
//! - [`storage`]: Photo directory, file naming and thumbnails
//! - [`terminal`]: Terminal runtime driving the screen controller
//!
//! # Example
//!
//! ```ignore
//! // This is an interactive application, typically run via:
//! // viewfinder
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod flash;
pub mod pipelines;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{AppModel, Message};
pub use config::Config;

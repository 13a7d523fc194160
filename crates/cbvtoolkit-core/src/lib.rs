//! # cbvtoolkit-core
//!
//! Core types shared by every cbvtoolkit crate. This crate has no framework
//! dependencies of its own.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Toolkit settings with defaults
//! - [`settings_loader`] - Loading settings from TOML and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

pub use error::{ToolkitError, ToolkitResult};
pub use settings::Settings;

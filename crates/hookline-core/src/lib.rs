//! # hookline-core
//!
//! Foundation types shared by the hookline crates:
//!
//! - **Errors**: [`HooklineError`] via `thiserror`, with the [`Result`] alias
//! - **Endpoints**: [`Endpoint`], a validated `http`/`https` URL
//! - **Logging**: the [`Logger`] collaborator, its `tracing` default and
//!   subscriber setup, plus capture utilities for tests

#![deny(unsafe_code)]

pub mod endpoint;
pub mod errors;
pub mod logging;

pub use endpoint::{Endpoint, is_valid_url};
pub use errors::{HooklineError, Result};
pub use logging::{Logger, TracingLogger, default_logger, init_subscriber};

//! # scriptorium-core
//!
//! Core types for the scriptorium project:
//!
//! - **Errors** - the project-wide [`ScriptoriumError`] enum
//! - **Settings** - the [`Settings`](settings::Settings) struct with TOML and
//!   environment loading
//! - **Logging** - [`tracing`]-based logging configured from settings
//! - **Translation catalogs** - the message catalog format compiled by
//!   `compilemessages`

// result_large_err: ScriptoriumError is the project-wide error type
#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]

pub mod error;
pub mod i18n;
pub mod logging;
pub mod settings;
pub mod settings_loader;

pub use error::{ScriptoriumError, ScriptoriumResult};
pub use i18n::TranslationCatalog;
pub use settings::{CompressSettings, DatabaseSettings, Settings, TranspileSettings};

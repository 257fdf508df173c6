//! # scriptorium-cli
//!
//! The management command framework and built-in commands for scriptorium.
//!
//! This crate provides:
//!
//! - **Management commands** - the [`ManagementCommand`] trait, the
//!   [`CommandRegistry`], and the built-in commands (`migrate`, `flush`,
//!   `loaddata`, `collectstatic`, `compress`, `compilemessages`,
//!   `showmigrations`)
//! - **Serialization** - JSON fixture (de)serialization
//!
//! All I/O is async to avoid blocking the tokio runtime. Each built-in
//! command exposes its behavior as a public function, so project commands
//! can sequence the same steps without re-parsing arguments.
//!
//! ## Quick Start
//!
//! ```rust
//! use scriptorium_cli::command::CommandRegistry;
//! use scriptorium_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//!
//! let names = registry.list_commands();
//! assert!(names.contains(&"migrate"));
//! assert!(names.contains(&"loaddata"));
//! ```

// result_large_err: ScriptoriumError is the project-wide error type
// unused_async: command handlers keep consistent async signatures
#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::unused_async)]

pub mod command;
pub mod commands;
pub mod serialization;

pub use command::{CommandRegistry, ManagementCommand};
pub use serialization::{JsonSerializer, PrettyJsonSerializer, Serializer};

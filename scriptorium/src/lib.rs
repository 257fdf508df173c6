//! # scriptorium
//!
//! The scriptorium project: a collaborative document editing platform. This
//! crate holds the project-specific pieces — settings, domain models and the
//! `init`/`transpile` commands — on top of the framework crates.

#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::unused_async)]

pub mod commands;
pub mod models;
pub mod settings;

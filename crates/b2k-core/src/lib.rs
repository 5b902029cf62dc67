//! Core domain + application logic for the book-to-Kindle Telegram bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and Calibre live
//! behind ports (traits) implemented in adapter crates.

pub mod book;
pub mod config;
pub mod converter;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod orchestrator;
pub mod registry;
pub mod temp_files;
pub mod tool;
pub mod utils;

pub use errors::{Error, Result};

//! tasklink - Shareable To-Do List Library
//!
//! This library provides the core functionality for the tasklink CLI: a
//! to-do list that lives in a local key-value store and can be handed to
//! someone else as a single link.
//!
//! # Core Concepts
//!
//! - **Tasks**: id, text, checked flag and creation time, kept oldest first
//! - **Write-through**: every change is persisted before control returns
//! - **Share payload**: the whole list as URL-safe Base64 JSON, carried in
//!   the query of the page address
//! - **Load path**: opening a link that carries a payload replaces the
//!   local list; a malformed payload is discarded and the address cleared
//!
//! # Module Organization
//!
//! - `task`: Task and settings records, id and clock sources
//! - `store`: In-memory ordered task list
//! - `kv`: Key-value store trait with memory and file backends
//! - `persistence`: Task and settings records on top of a key-value store
//! - `share`: Share payload codec
//! - `address`: Page address and URL synchronization
//! - `session`: Load state machine and write-through mutations
//! - `config`: Configuration loading from `tasklink.toml`
//! - `lock`: File locking and atomic writes
//! - `output`: Human and JSON output for the CLI
//! - `cli`: Command-line interface using clap
//! - `error`: Error types and result aliases

pub mod address;
pub mod cli;
pub mod config;
pub mod error;
pub mod kv;
pub mod lock;
pub mod output;
pub mod persistence;
pub mod session;
pub mod share;
pub mod store;
pub mod task;

pub use error::{Error, Result};

//! # TableTalk
//!
//! Load a CSV or Excel table, reshape it through a closed set of
//! transformations with a full audit trail, ask questions about it in plain
//! language, and export the result.
//!
//! ```no_run
//! use tabletalk::pipeline::{Operation, Pipeline};
//!
//! let bytes = std::fs::read("sales.csv")?;
//! let table = tabletalk::ingest::load(&bytes, "sales.csv")?;
//!
//! let mut pipeline = Pipeline::new(table);
//! pipeline.apply(&Operation::Sort {
//!     column: "revenue".to_owned(),
//!     ascending: false,
//! })?;
//!
//! for line in pipeline.log().numbered() {
//!     println!("{line}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Modules
//!
//! - [`ingest`]: bytes plus a file name to a table
//! - [`pipeline`]: operations, the executor and the operation log
//! - [`table`]: column helpers and the [`table::TableSummary`] fed to the model
//! - [`ai`]: prompt construction and the chat completion client
//! - [`export`]: CSV and spreadsheet output
//! - [`session`]: per-user state tying the above together
//! - [`config`], [`logging`], [`error`]: ambient plumbing

#![warn(clippy::all, rust_2018_idioms)]

pub mod ai;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod session;
pub mod table;

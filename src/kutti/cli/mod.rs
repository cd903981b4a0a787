//! # CLI Behavior
//!
//! This is **one possible UI client** for the console, not the console itself.
//! The CLI is the only place that knows about terminal I/O, exit codes, and output formatting.
//!
//! For the overall architecture, see the crate-level documentation of `kutti`.
//!
//! ## Pages As Commands
//!
//! Each page of the console maps to a command: `list` is the data grid
//! (search, filters, sort, paging, table or cards), `view` the detail page,
//! `create` and `edit` the record form, `export` the grid's CSV button.
//! `route` answers what the shell would do with a path for the signed-in user.
//!
//! ## Offline Commands
//!
//! `help` and `config` never touch the network or the stored session, so the
//! console can be pointed at its API before anything else works.
//!
//! ## Logging
//!
//! Diagnostics go to stderr through `tracing`. The default level is `warn`;
//! `--verbose` raises it to `debug` and `RUST_LOG` overrides both.
//!
//! ## Module Structure
//!
//! - `commands`: Per-command handlers that call the API and format output
//! - `render`: Output formatting (tables, cards, detail, messages)
//! - `setup`: Argument parsing via clap, help text
//! - `styles`: Terminal styling constants
//! - `templates`: Output templates

mod commands;
mod render;
pub mod setup;
mod styles;
mod templates;

pub use commands::run;

//! # Kutti Architecture
//!
//! Kutti is the administrative console of a child-sponsorship platform:
//! missions, the children they follow, news about those children, and the
//! people (administrators, local referents, sponsors) who work with them.
//! The console is a library first; the `kutti` binary is one client of it.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, renders output, owns the terminal      │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Normalizes inputs (key=value pairs, reading language)    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Role checks, grid and form orchestration                 │
//! │  - Returns CmdResult, never prints                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Core                                                       │
//! │  - grid/ (filter, sort, paginate, export)                   │
//! │  - form/ (values, validation, media)                        │
//! │  - translate, shell, session, registry                      │
//! │  - client/ (Transport: HTTP or in-memory)                   │
//! │  - store/ (SessionStore: file or in-memory)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## No I/O Assumptions in Core
//!
//! From `api.rs` inward, code takes Rust arguments and returns
//! `Result<CmdResult>`. It never writes to stdout or stderr and never exits.
//! Network and storage sit behind the [`client::Transport`] and
//! [`store::SessionStore`] traits, so every command is tested against the
//! in-memory implementations.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade
//! - [`commands`]: One module per console operation
//! - [`grid`]: The data grid engine behind every listing
//! - [`form`]: The generic record form
//! - [`registry`]: Per-entity columns, fields and permissions
//! - [`translate`]: Cached field translation
//! - [`shell`]: Routes, role gating and navigation
//! - [`session`]: The signed-in user
//! - [`client`]: REST transport
//! - [`store`]: Session persistence
//! - [`config`]: Console configuration
//! - [`model`], [`dates`], [`error`]: Shared types
//! - `cli`: Argument parsing and templated rendering for the binary (not part of the lib API)

pub mod api;
pub mod client;
pub mod commands;
pub mod config;
pub mod dates;
pub mod error;
pub mod form;
pub mod grid;
pub mod init;
pub mod model;
pub mod registry;
pub mod session;
pub mod shell;
pub mod store;
pub mod translate;

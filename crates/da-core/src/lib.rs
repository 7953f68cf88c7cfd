//! Device Audit core library.
//!
//! Parses and classifies the text a device bridge returns about an attached
//! Android device, and serves the results over HTTP:
//! - `collect`: bridge invocation and the dump parsers
//! - `inspect`: per-request orchestration shared by the CLI and HTTP layer
//! - `server`: HTTP routes and the worker pool
//! - `config`, `logging`, `exit_codes`, `schema`: ambient plumbing
//!
//! The binary entry point is in `main.rs`.

pub mod collect;
pub mod config;
pub mod exit_codes;
pub mod inspect;
pub mod logging;
pub mod schema;
pub mod server;

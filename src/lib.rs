//! aicompanion is a terminal client that streams chat replies from a local
//! Ollama server or an OpenAI-compatible API.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core::stream`] is the incremental response decoder: it splits the body
//!   into lines, decodes each line for the provider's wire dialect, hands text
//!   fragments to a callback as they arrive and decides when a reply is done.
//! - [`core::client`] sends requests and records finished turns in the
//!   [`core::conversation`] history, using settings from [`core::config`].
//! - [`ui`] draws the waiting indicator and the colored reply.
//! - [`api`] defines the request and response payloads for both providers.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;

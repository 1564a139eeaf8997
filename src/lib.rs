//! MCP Explorer browses a catalog of MCP service descriptors and chats with
//! them from the terminal.
//!
//! The crate is organized around a few collaborating layers:
//! - [`core`] owns the stores (settings, chat sessions, test entries), the
//!   service catalog and the per-conversation chat client with its mock and
//!   live backends.
//! - [`api`] defines the chat-completion and model-list payloads used by the
//!   live backend.
//! - [`cli`] parses arguments and runs the subcommands, including the
//!   interactive chat loop.
//! - [`utils`] holds URL, authentication header and transcript logging helpers.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;

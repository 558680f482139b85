//! Notes MCP Server Library
//!
//! A Model Context Protocol (MCP) server exposing a local notes folder
//! (text and PDF files) and Google Calendar as tools, plus a small client
//! for exercising it by hand.

pub mod calendar;
pub mod client;
pub mod config;
pub mod error;
pub mod mcp;
pub mod notes;

pub use config::Config;
pub use error::{NotesMcpError, Result};

//! MCP test client
//!
//! Spawns an MCP server, lists its tools and invokes them for manual testing.

pub mod config;
pub mod display;
pub mod interactive;
pub mod session;

//! Google Calendar module
//!
//! Contains types, authentication, and client for the Google Calendar API.

pub mod auth;
pub mod client;
pub mod types;

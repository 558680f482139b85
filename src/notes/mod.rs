//! Notes module
//!
//! Lists and reads note files from the configured notes folder.

pub mod pdf;
pub mod store;
pub mod types;

//! # Miniblog Shared
//!
//! Request/response types and form validation shared by the server and any
//! Rust client. This crate has no server dependencies.

pub mod dto;
pub mod forms;
pub mod response;

pub use forms::FormErrors;
pub use response::{ApiResponse, ErrorResponse};

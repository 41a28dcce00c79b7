// ABOUTME: Library root for localcloud - exposes the image registry and its collaborators.
// ABOUTME: The CLI binary is in main.rs.

pub mod cloud;
pub mod config;
pub mod error;
pub mod output;
pub mod types;

//! Directiva Agrícola server
//!
//! Library surface of the server binary: configuration, user store,
//! handlers, and router assembly. Exposed so the integration-test
//! crate can drive the assembled application in-process.

pub mod app;
pub mod config;
pub mod handlers;
pub mod users;

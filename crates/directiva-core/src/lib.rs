//! Directiva Core Types
//!
//! This crate provides the fundamental types shared across the Directiva
//! Agrícola workspace:
//! - Core error taxonomy
//! - Tenant (empresa) identity and storage-target derivation
//! - Presentation filters used by the rendering layer

pub mod error;
pub mod filters;
pub mod tenant;

pub use error::{Error, Result};
pub use tenant::TenantId;

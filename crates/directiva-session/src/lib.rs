//! Session model and storage abstractions
//!
//! This crate defines the session record and payload types, the
//! `SessionStore` trait implemented by storage backends, the
//! single-session enforcement hook invoked by the login flow, and the
//! expired-session cleanup loop.

pub mod cleanup;
pub mod enforce;
pub mod memory;
pub mod payload;
pub mod record;
pub mod store;

pub use enforce::{EnforcementStats, enforce_single_session};
pub use memory::InMemorySessionStore;
pub use payload::{AUTH_USER_KEY, PayloadError, SessionPayload, TENANT_KEY};
pub use record::SessionRecord;
pub use store::{EncodedSession, SessionStore};

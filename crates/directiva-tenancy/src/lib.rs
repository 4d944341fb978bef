//! Tenant database registry
//!
//! Connection descriptors for tenant datastores and the registry that
//! turns a tenant ID into a pooled database handle. Handles are
//! per-request context values: the registry never mutates a shared
//! "current connection" slot, so concurrent requests for different
//! tenants cannot observe each other's selection.

mod descriptor;
mod registry;

pub use descriptor::{ConnectionDescriptor, DbEngine};
pub use registry::{TenantHandle, TenantRegistry};

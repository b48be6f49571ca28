//! Authentication

pub mod tenant_auth;

pub use tenant_auth::{TenantIdentity, create_token, tenant_auth_middleware, verify_token};

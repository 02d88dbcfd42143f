//! Typed wrappers over public backend resources.
//!
//! ARCHITECTURE
//! ============
//! Each service owns an [`ApiClient`](crate::api::ApiClient) handle and, for
//! slow-changing data, a [`cache::CachedResource`] so concurrent callers
//! share one fetch. CSRF tokens bypass the API client entirely and live in
//! session-scoped storage.

pub mod boosted;
pub mod cache;
pub mod csrf;
pub mod maintenance;
pub mod server;
pub mod social;

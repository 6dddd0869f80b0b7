//! Paginated job endpoints backed by the search and recommend caches.

pub mod handlers;
pub mod pagination;
pub mod resume;

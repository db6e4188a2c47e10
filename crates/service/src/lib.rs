//! Service layer: local JSON fallback storage and the domain helpers shared by proxy handlers.
//! - `storage` holds the generic file-backed record list and its trait seam.
//! - `file` holds the per-entity stores (blogs, users, enrollments, brochure config).
//! - `mapping` turns the backend's many field spellings into one canonical shape.

pub mod errors;
pub mod ids;
pub mod runtime;
pub mod storage;
pub mod file;
pub mod mapping;
pub mod pagination;
pub mod uploads;
#[cfg(test)]
pub mod test_support;

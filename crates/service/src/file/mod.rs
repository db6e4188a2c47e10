//! Per-entity local stores built on [`crate::storage::JsonListStore`].

pub mod blogs;
pub mod brochure;
pub mod enrollments;
pub mod users;

//! HTTP surface: room pages, health, and static assets

pub mod routes;

pub use routes::build_router;

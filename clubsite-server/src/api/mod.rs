//! HTTP API handlers

pub mod admin;
pub mod download;
pub mod health;
pub mod public;

pub use admin::admin_routes;
pub use download::download_routes;
pub use health::health_routes;
pub use public::public_routes;

//! HTTP API handlers for setlist-ingest

pub mod health;
pub mod maintenance;
pub mod tracklist;

pub use health::health_routes;
pub use maintenance::maintenance_routes;
pub use tracklist::tracklist_routes;

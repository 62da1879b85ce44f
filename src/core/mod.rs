// LogScope - core/mod.rs
//
// Core business logic layer.
// Must NOT depend on: ui, platform, app, or perform process management.

pub mod aggregate;
pub mod dashboard;
pub mod datetime;
pub mod export;
pub mod filter;
pub mod mask;
pub mod model;
pub mod params;
pub mod registry;
pub mod table;
pub mod template;

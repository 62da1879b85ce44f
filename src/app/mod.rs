// LogScope - app/mod.rs
//
// Application layer: registry loading, parse runs, session state, preview.
// Dependencies: core layer.
// Must NOT depend on: ui, platform specifics.

pub mod adapter;
pub mod miner;
pub mod preview;
pub mod registry_mgr;
pub mod session;

// LogScope - ui/mod.rs
//
// UI layer: plain-text presentation only.
// Dependencies: app (session results, preview), core (read-only models).
// Must NOT depend on: platform, direct file I/O.

pub mod dashboard;
pub mod listing;

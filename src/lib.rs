// LogScope - lib.rs
//
// Library entry point, exposing every module for the command-line binary
// and for integration testing.

pub mod app;
pub mod core;
pub mod platform;
pub mod ui;
pub mod util;

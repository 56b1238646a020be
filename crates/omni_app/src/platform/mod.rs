//! Host side of the `omni` binary: argument parsing, configuration, logging
//! and wiring of the engine.
mod app;
mod cli;
mod config;
mod ingest;
mod logging;
mod render;

pub use app::run_app;

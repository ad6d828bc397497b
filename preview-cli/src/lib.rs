// ABOUTME: Library exports for the gutter preview CLI modules
// ABOUTME: Makes internal modules available to integration tests and benchmarks

pub mod cli;
pub mod cli_output;
pub mod config;
pub mod constants;
pub mod host;
pub mod output;
pub mod runner;

//! Library crate for port-hunter-rs: scanner output parsing, two-generation
//! snapshot storage and port-change reporting.
pub mod diff;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod runner;
pub mod store;
pub mod types;

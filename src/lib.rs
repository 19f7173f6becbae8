pub mod config;
pub mod embedding;
pub mod errors;
pub mod graph;
pub mod history;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod server;
pub mod state;
pub mod tools;

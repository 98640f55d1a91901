pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod render;

pub use config::Config;
pub use error::{RelgraphError, Result};
pub use graph::{compile, CompiledDiagram, Compiler, RelationshipGraph, RelationshipRecord};

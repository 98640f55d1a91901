pub mod openai;

pub use openai::OpenAiExtractor;

use async_trait::async_trait;

use crate::error::Result;
use crate::graph::RelationshipGraph;

/// Input for one relationship extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub story_text: String,
    pub question: String,
}

impl ExtractionRequest {
    pub fn new(story_text: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            story_text: story_text.into(),
            question: question.into(),
        }
    }
}

/// Produces relationship records for a question about a story.
///
/// Each call may return a different graph for the same request; the pipeline
/// relies on that when it regenerates after a render failure.
#[async_trait]
pub trait RelationSource: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> Result<RelationshipGraph>;
}

//! Regenerate-compile-render loop.
//!
//! A render failure usually means the extracted relationships produced a
//! diagram the renderer rejects, so each retry asks the relation source for a
//! fresh graph instead of re-sending the same text.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{RelgraphError, Result};
use crate::graph::{CompiledDiagram, Compiler};
use crate::llm::{ExtractionRequest, RelationSource};
use crate::render::{DiagramRenderer, RenderedDiagram};

/// Result of a pipeline run that produced at least one diagram
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The renderer accepted a diagram.
    Rendered {
        diagram: CompiledDiagram,
        source: String,
        image: RenderedDiagram,
        attempts: usize,
        elapsed: Duration,
    },
    /// Every attempt failed to render; carries the last diagram text so the
    /// caller can still show it.
    Fallback {
        diagram: CompiledDiagram,
        source: String,
        error: RelgraphError,
        attempts: usize,
    },
}

impl PipelineOutcome {
    /// Mermaid text of the final diagram, rendered or not
    pub fn source(&self) -> &str {
        match self {
            PipelineOutcome::Rendered { source, .. } | PipelineOutcome::Fallback { source, .. } => {
                source
            }
        }
    }

    pub fn diagram(&self) -> &CompiledDiagram {
        match self {
            PipelineOutcome::Rendered { diagram, .. } | PipelineOutcome::Fallback { diagram, .. } => {
                diagram
            }
        }
    }

    pub fn attempts(&self) -> usize {
        match self {
            PipelineOutcome::Rendered { attempts, .. } | PipelineOutcome::Fallback { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, PipelineOutcome::Rendered { .. })
    }
}

/// Story + question in, rendered relationship diagram out
pub struct DiagramPipeline {
    source: Arc<dyn RelationSource>,
    renderer: Arc<dyn DiagramRenderer>,
    compiler: Compiler,
    max_attempts: usize,
}

impl DiagramPipeline {
    /// `max_attempts` below 1 is treated as 1.
    pub fn new(
        source: Arc<dyn RelationSource>,
        renderer: Arc<dyn DiagramRenderer>,
        compiler: Compiler,
        max_attempts: usize,
    ) -> Self {
        Self {
            source,
            renderer,
            compiler,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Run up to `max_attempts` extract-compile-render cycles.
    ///
    /// Returns `Err` only when no attempt produced a diagram at all, or when
    /// the relation source fails with an error retrying cannot fix.
    pub async fn run(&self, request: &ExtractionRequest) -> Result<PipelineOutcome> {
        let start = Instant::now();
        let mut last_failure: Option<(CompiledDiagram, String, RelgraphError)> = None;
        let mut last_extract_error: Option<RelgraphError> = None;

        for attempt in 1..=self.max_attempts {
            let graph = match self.source.extract(request).await {
                Ok(graph) => graph,
                Err(e @ RelgraphError::LlmStatus { .. }) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    log::warn!(
                        "Attempt {}/{}: relation extraction failed: {}",
                        attempt,
                        self.max_attempts,
                        e
                    );
                    last_extract_error = Some(e);
                    continue;
                }
            };

            let diagram = self.compiler.compile(&graph);
            let source = diagram.to_mermaid();

            match self.renderer.render(&source).await {
                Ok(image) => {
                    let elapsed = start.elapsed();
                    log::info!(
                        "Rendered diagram with {} nodes on attempt {}/{} in {:?}",
                        diagram.nodes.len(),
                        attempt,
                        self.max_attempts,
                        elapsed
                    );
                    return Ok(PipelineOutcome::Rendered {
                        diagram,
                        source,
                        image,
                        attempts: attempt,
                        elapsed,
                    });
                }
                Err(e) => {
                    log::warn!(
                        "Attempt {}/{}: render failed, regenerating: {}",
                        attempt,
                        self.max_attempts,
                        e
                    );
                    last_failure = Some((diagram, source, e));
                }
            }
        }

        match last_failure {
            Some((diagram, source, error)) => {
                log::warn!(
                    "Giving up after {} attempts, returning diagram text: {}",
                    self.max_attempts,
                    error
                );
                Ok(PipelineOutcome::Fallback {
                    diagram,
                    source,
                    error,
                    attempts: self.max_attempts,
                })
            }
            None => Err(last_extract_error.unwrap_or_else(|| {
                RelgraphError::Llm("relation source produced no graph".to_string())
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{RelationKind, RelationshipGraph, RelationshipRecord};
    use crate::render::OutputFormat;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns queued results in order, then repeats the last graph.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<RelationshipGraph>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<RelationshipGraph>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RelationSource for ScriptedSource {
        async fn extract(&self, _request: &ExtractionRequest) -> Result<RelationshipGraph> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RelgraphError::Llm("script exhausted".to_string())))
        }
    }

    /// Rejects any diagram mentioning a banned name.
    struct PickyRenderer {
        banned: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DiagramRenderer for PickyRenderer {
        async fn render(&self, source: &str) -> Result<RenderedDiagram> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if source.contains(self.banned) {
                return Err(RelgraphError::Render("Kroki returned 400 Bad Request".to_string()));
            }
            Ok(RenderedDiagram {
                format: OutputFormat::Svg,
                bytes: source.as_bytes().to_vec(),
            })
        }
    }

    fn graph(source: &str, target: &str) -> RelationshipGraph {
        RelationshipGraph::new(vec![RelationshipRecord::new(
            source,
            target,
            RelationKind::Bidirectional,
            "仲間",
        )])
        .with_focus([source])
    }

    fn pipeline(source: Arc<ScriptedSource>, renderer: Arc<PickyRenderer>, attempts: usize) -> DiagramPipeline {
        DiagramPipeline::new(source, renderer, Compiler::default(), attempts)
    }

    fn request() -> ExtractionRequest {
        ExtractionRequest::new("story", "question")
    }

    #[tokio::test]
    async fn test_first_attempt_renders() {
        let source = ScriptedSource::new(vec![Ok(graph("レイン", "カナデ"))]);
        let renderer = Arc::new(PickyRenderer { banned: "BROKEN", calls: AtomicUsize::new(0) });
        let outcome = pipeline(source, renderer, 3).run(&request()).await.unwrap();

        assert!(outcome.is_rendered());
        assert_eq!(outcome.attempts(), 1);
        assert!(outcome.diagram().is_highlighted("レイン"));
        assert!(outcome.source().starts_with("graph LR"));
    }

    #[tokio::test]
    async fn test_regenerates_after_render_failure() {
        let source = ScriptedSource::new(vec![
            Ok(graph("BROKEN", "カナデ")),
            Ok(graph("レイン", "カナデ")),
        ]);
        let renderer = Arc::new(PickyRenderer { banned: "BROKEN", calls: AtomicUsize::new(0) });
        let outcome = pipeline(source.clone(), renderer.clone(), 3)
            .run(&request())
            .await
            .unwrap();

        match outcome {
            PipelineOutcome::Rendered { attempts, source: text, .. } => {
                assert_eq!(attempts, 2);
                assert!(text.contains("レイン"));
            }
            other => panic!("expected rendered outcome, got {:?}", other),
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_falls_back_to_last_text() {
        let source = ScriptedSource::new(vec![
            Ok(graph("BROKEN", "A")),
            Ok(graph("BROKEN", "B")),
        ]);
        let renderer = Arc::new(PickyRenderer { banned: "BROKEN", calls: AtomicUsize::new(0) });
        let outcome = pipeline(source, renderer, 2).run(&request()).await.unwrap();

        match outcome {
            PipelineOutcome::Fallback { source, error, attempts, .. } => {
                assert_eq!(attempts, 2);
                assert!(source.contains("\"B\""));
                assert!(matches!(error, RelgraphError::Render(_)));
            }
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extract_failure_then_success() {
        let source = ScriptedSource::new(vec![
            Err(RelgraphError::Parse("JSON parse error".to_string())),
            Ok(graph("レイン", "カナデ")),
        ]);
        let renderer = Arc::new(PickyRenderer { banned: "BROKEN", calls: AtomicUsize::new(0) });
        let outcome = pipeline(source, renderer, 3).run(&request()).await.unwrap();
        assert_eq!(outcome.attempts(), 2);
    }

    #[tokio::test]
    async fn test_no_graph_is_error() {
        let source = ScriptedSource::new(vec![]);
        let renderer = Arc::new(PickyRenderer { banned: "BROKEN", calls: AtomicUsize::new(0) });
        let result = pipeline(source.clone(), renderer.clone(), 3).run(&request()).await;

        assert!(matches!(result, Err(RelgraphError::Llm(_))));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_stops_immediately() {
        let source = ScriptedSource::new(vec![Err(RelgraphError::LlmStatus {
            status: 401,
            body: "invalid api key".to_string(),
        })]);
        let renderer = Arc::new(PickyRenderer { banned: "BROKEN", calls: AtomicUsize::new(0) });
        let result = pipeline(source.clone(), renderer, 3).run(&request()).await;

        assert!(matches!(result, Err(RelgraphError::LlmStatus { status: 401, .. })));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let source = ScriptedSource::new(vec![]);
        let renderer = Arc::new(PickyRenderer { banned: "BROKEN", calls: AtomicUsize::new(0) });
        assert_eq!(pipeline(source, renderer, 0).max_attempts(), 1);
    }
}

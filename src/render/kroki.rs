use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use reqwest::Client;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{DiagramRenderer, OutputFormat, RenderedDiagram};
use crate::cache::RenderCache;
use crate::config::RendererConfig;
use crate::error::{RelgraphError, Result};

/// Kroki HTTP renderer
///
/// Sends `GET {base_url}/mermaid/{format}/{payload}` where the payload is the
/// zlib-compressed, base64url-encoded diagram source.
pub struct KrokiRenderer {
    client: Client,
    base_url: String,
    format: OutputFormat,
    cache: Option<Arc<RenderCache>>,
}

impl KrokiRenderer {
    /// Create a renderer without a cache
    pub fn new(base_url: &str, format: OutputFormat, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelgraphError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            format,
            cache: None,
        })
    }

    /// Create a renderer from `[renderer]` settings; a non-zero
    /// `cache_capacity` enables the render cache.
    pub fn from_config(config: &RendererConfig) -> Result<Self> {
        let renderer = Self::new(
            &config.base_url,
            config.format,
            Duration::from_secs(config.timeout_secs),
        )?;

        Ok(if config.cache_capacity > 0 {
            renderer.with_cache(Arc::new(RenderCache::new(config.cache_capacity)))
        } else {
            renderer
        })
    }

    pub fn with_cache(mut self, cache: Arc<RenderCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Full request URL for a diagram source
    pub fn render_url(&self, source: &str) -> Result<String> {
        Ok(format!(
            "{}/mermaid/{}/{}",
            self.base_url,
            self.format.as_str(),
            encode_payload(source)?
        ))
    }

    async fn fetch(&self, source: &str) -> Result<Vec<u8>> {
        let url = self.render_url(source)?;

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RelgraphError::Render(format!("Network error: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(RelgraphError::Render(format!(
                "Kroki returned {}: {}",
                status,
                body.trim()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelgraphError::Render(format!("Failed to read response: {}", e)))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl DiagramRenderer for KrokiRenderer {
    async fn render(&self, source: &str) -> Result<RenderedDiagram> {
        if let Some(cache) = &self.cache {
            if let Some(bytes) = cache.get(self.format, source) {
                log::debug!("Render cache hit ({} bytes)", bytes.len());
                return Ok(RenderedDiagram {
                    format: self.format,
                    bytes,
                });
            }
        }

        let start = Instant::now();
        let bytes = self.fetch(source).await?;
        log::debug!(
            "Kroki rendered {} ({} bytes) in {:?}",
            self.format,
            bytes.len(),
            start.elapsed()
        );

        if let Some(cache) = &self.cache {
            cache.put(self.format, source.to_string(), bytes.clone());
        }

        Ok(RenderedDiagram {
            format: self.format,
            bytes,
        })
    }
}

/// Kroki payload: zlib (best compression) then URL-safe base64.
pub fn encode_payload(source: &str) -> Result<String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(source.as_bytes())?;
    let compressed = encoder.finish()?;
    Ok(URL_SAFE.encode(compressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::get, Router};
    use flate2::read::ZlibDecoder;
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn decode_payload(payload: &str) -> String {
        let compressed = URL_SAFE.decode(payload).unwrap();
        let mut text = String::new();
        ZlibDecoder::new(&compressed[..]).read_to_string(&mut text).unwrap();
        text
    }

    /// Fake Kroki: echoes the decoded source inside an <svg>, rejects sources
    /// containing "BROKEN" with 400.
    async fn spawn_fake_kroki(hits: Arc<AtomicUsize>) -> String {
        let app = Router::new().route(
            "/mermaid/:format/:payload",
            get(move |Path((format, payload)): Path<(String, String)>| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let source = decode_payload(&payload);
                    if source.contains("BROKEN") {
                        return (StatusCode::BAD_REQUEST, "Syntax error in graph".to_string());
                    }
                    (StatusCode::OK, format!("<{}>{}</{}>", format, source, format))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_encode_payload_is_url_safe_zlib() {
        let source = "graph LR\n    id_6461[\"Alice\"]\n    id_6461 -->|友人??| id_3396";
        let payload = encode_payload(source).unwrap();
        assert!(!payload.contains('+') && !payload.contains('/'));
        assert_eq!(decode_payload(&payload), source);
    }

    #[test]
    fn test_render_url_shape() {
        let renderer =
            KrokiRenderer::new("https://kroki.io/", OutputFormat::Png, Duration::from_secs(5)).unwrap();
        assert_eq!(renderer.format(), OutputFormat::Png);
        let url = renderer.render_url("graph LR").unwrap();
        assert!(url.starts_with("https://kroki.io/mermaid/png/"));
    }

    #[tokio::test]
    async fn test_render_success_and_cache() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_fake_kroki(hits.clone()).await;
        let renderer = KrokiRenderer::new(&base, OutputFormat::Svg, Duration::from_secs(5))
            .unwrap()
            .with_cache(Arc::new(RenderCache::new(4)));

        let first = renderer.render("graph LR").await.unwrap();
        assert_eq!(first.format, OutputFormat::Svg);
        assert_eq!(first.bytes, b"<svg>graph LR</svg>".to_vec());

        let second = renderer.render("graph LR").await.unwrap();
        assert_eq!(second, first);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_render_rejection_is_render_error() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_fake_kroki(hits).await;
        let renderer = KrokiRenderer::new(&base, OutputFormat::Svg, Duration::from_secs(5)).unwrap();

        let err = renderer.render("graph LR\n    BROKEN").await.unwrap_err();
        match err {
            RelgraphError::Render(msg) => assert!(msg.contains("400"), "{}", msg),
            other => panic!("expected render error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_renderer_is_render_error() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let renderer = KrokiRenderer::new(
            &format!("http://{}", addr),
            OutputFormat::Svg,
            Duration::from_secs(2),
        )
        .unwrap();
        assert!(matches!(
            renderer.render("graph LR").await,
            Err(RelgraphError::Render(_))
        ));
    }
}

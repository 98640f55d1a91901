//! Diagram rendering behind the [`DiagramRenderer`] seam.

pub mod kroki;

pub use kroki::{encode_payload, KrokiRenderer};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Result;

/// Image format requested from the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Svg,
    Png,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
        }
    }

    /// File extension for written images
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "svg" => Ok(OutputFormat::Svg),
            "png" => Ok(OutputFormat::Png),
            other => Err(format!("unsupported output format: {} (expected svg or png)", other)),
        }
    }
}

/// Image bytes returned by a renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

/// Turns Mermaid source into an image.
///
/// Rejections, timeouts and network failures are all
/// [`RelgraphError::Render`](crate::error::RelgraphError::Render).
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    async fn render(&self, source: &str) -> Result<RenderedDiagram>;
}

//! Transport to the external high-quality renderer.

use crate::config::RenderConfig;
use crate::error::{DatacubesError, Result, ResultExt};
use crate::render::request::RenderRequest;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Fallback when the renderer sends no content type.
const DEFAULT_CONTENT_TYPE: &str = "image/png";

/// A rendered image as returned by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl RenderedImage {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// `data:` URL that can be displayed directly.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }
}

/// Something that turns a render request into an image.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedImage>;
}

/// POSTs the request as JSON to the renderer endpoint.
pub struct HttpRenderBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRenderBackend {
    pub fn new(config: &RenderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DatacubesError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RenderBackend for HttpRenderBackend {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedImage> {
        tracing::debug!(
            "POST {} ({} scene element(s), {}x{})",
            self.endpoint,
            request.scene_elements.len(),
            request.width,
            request.height
        );
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach renderer at {}", self.endpoint))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DatacubesError::Render(format!(
                "renderer answered {}",
                status
            )));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes = response
            .bytes()
            .await
            .context("Failed to read rendered image")?;
        if bytes.is_empty() {
            return Err(DatacubesError::Render("renderer sent an empty body".into()));
        }
        Ok(RenderedImage::new(bytes.to_vec(), content_type))
    }
}

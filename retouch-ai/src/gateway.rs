//! # AI Tool Gateway
//!
//! The three AI-flavoured tools the editor offers:
//!
//! | Tool                | Network | Retries | Failure handling            |
//! |---------------------|---------|---------|-----------------------------|
//! | background removal  | yes     | yes     | falls back to a radial mask |
//! | region erase        | no      | no      | decode/encode errors only   |
//! | upscale             | no      | no      | records the level only      |
//!
//! The gateway never touches edit state or history; it maps images to
//! images and leaves committing to the caller.

use std::sync::Arc;
use std::time::Duration;

use retouch_core::{CoreError, EraserStroke, ImageBuffer, UpscaleLevel};
use retouch_renderer::image::{decode, encode_png};
use retouch_renderer::{clone_stamp, radial_alpha_mask, DisplayScale};
use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;
use crate::retry::{retry, RetryNotice, RetryOutcome, RetryPolicy, Sleeper, TokioSleeper};
use crate::service::{AiService, ServiceRequest};

/// Instruction sent with background-removal requests.
pub const DEFAULT_REMOVAL_INSTRUCTION: &str = "Remove the background from this image. Keep the main subject exactly as is, but make the background transparent. Return only the image.";

/// Gateway settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Instruction text for background removal.
    pub removal_instruction: String,
    /// Simulated processing time of the erase tool in milliseconds.
    pub erase_delay_ms: u64,
    /// Simulated processing time of the upscale tool in milliseconds.
    pub upscale_delay_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            removal_instruction: DEFAULT_REMOVAL_INSTRUCTION.to_string(),
            erase_delay_ms: 800,
            upscale_delay_ms: 1500,
        }
    }
}

/// Which path produced a background removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalPath {
    /// The external service returned the image.
    Service,
    /// The service failed and the local radial mask was applied.
    Fallback {
        /// Why the service result was not used.
        reason: String,
    },
}

/// Result of [`AiToolGateway::remove_background`].
#[derive(Debug, Clone)]
pub struct BackgroundRemoval {
    /// The cut-out image.
    pub image: ImageBuffer,
    /// Service or fallback.
    pub path: RemovalPath,
    /// Service attempts made.
    pub attempts: u32,
}

impl BackgroundRemoval {
    /// Whether the local fallback produced the image.
    #[must_use]
    pub fn used_fallback(&self) -> bool {
        matches!(self.path, RemovalPath::Fallback { .. })
    }
}

/// Entry point for AI tool operations.
#[derive(Clone)]
pub struct AiToolGateway {
    service: Arc<dyn AiService>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    config: GatewayConfig,
}

impl std::fmt::Debug for AiToolGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiToolGateway")
            .field("policy", &self.policy)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AiToolGateway {
    /// Create a gateway over `service` with default policy and timings.
    #[must_use]
    pub fn new(service: Arc<dyn AiService>) -> Self {
        Self {
            service,
            sleeper: Arc::new(TokioSleeper),
            policy: RetryPolicy::default(),
            config: GatewayConfig::default(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the gateway configuration.
    #[must_use]
    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the source of delays.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Remove the background of `image`.
    ///
    /// Rate-limit errors are retried under the policy, announcing each retry
    /// through `on_retry`. If the service never succeeds, for any reason, the
    /// radial mask fallback runs once and its result is returned.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GatewayError::Render`] only when the fallback cannot
    /// decode `image` or encode its result.
    pub async fn remove_background(
        &self,
        image: &ImageBuffer,
        on_retry: impl FnMut(RetryNotice) + Send,
    ) -> GatewayResult<BackgroundRemoval> {
        let request = ServiceRequest {
            image_bytes: image.bytes().to_vec(),
            mime_type: image.mime_type().to_string(),
            instruction: self.config.removal_instruction.clone(),
        };
        let service = &self.service;
        let request = &request;

        let outcome = retry(&self.policy, self.sleeper.as_ref(), on_retry, |attempt| async move {
            tracing::debug!(attempt, "Requesting background removal");
            service.edit_image(request).await
        })
        .await;

        let attempts = outcome.attempts();
        let error = match outcome {
            RetryOutcome::Success { value, .. } => {
                tracing::info!(attempts, bytes = value.image_bytes.len(), "Background removed by service");
                return Ok(BackgroundRemoval {
                    image: ImageBuffer::new(value.image_bytes, value.mime_type),
                    path: RemovalPath::Service,
                    attempts,
                });
            }
            RetryOutcome::Exhausted { error, .. } | RetryOutcome::Fatal { error, .. } => error,
        };

        tracing::warn!(attempts, error = %error, "Background removal service failed, using local fallback");
        let masked = radial_alpha_mask(&decode(image.bytes())?);
        Ok(BackgroundRemoval {
            image: ImageBuffer::png(encode_png(&masked)?),
            path: RemovalPath::Fallback {
                reason: error.to_string(),
            },
            attempts,
        })
    }

    /// Hide the regions under `strokes` with the clone-stamp heuristic.
    ///
    /// `display_size` is the size the image was shown at while the strokes
    /// were drawn; `None` means strokes are already in image pixels.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GatewayError::Render`] if `image` cannot be decoded or
    /// the result cannot be encoded.
    pub async fn erase_region(
        &self,
        image: &ImageBuffer,
        strokes: &[EraserStroke],
        display_size: Option<(f32, f32)>,
    ) -> GatewayResult<ImageBuffer> {
        self.sleeper
            .sleep(Duration::from_millis(self.config.erase_delay_ms))
            .await;

        let source = decode(image.bytes())?;
        let scale = display_size.map_or(DisplayScale::IDENTITY, |displayed| {
            DisplayScale::new(source.dimensions(), displayed)
        });
        let points: usize = strokes.iter().map(|s| s.points.len()).sum();
        tracing::debug!(strokes = strokes.len(), points, ?scale, "Erasing region");

        let erased = clone_stamp(&source, strokes, scale);
        Ok(ImageBuffer::png(encode_png(&erased)?))
    }

    /// Record an upscale to `level`. Pixels are not resampled.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidUpscaleLevel`] for [`UpscaleLevel::X1`].
    pub async fn upscale(&self, level: UpscaleLevel) -> GatewayResult<UpscaleLevel> {
        if level == UpscaleLevel::X1 {
            return Err(CoreError::InvalidUpscaleLevel(level.factor()).into());
        }
        self.sleeper
            .sleep(Duration::from_millis(self.config.upscale_delay_ms))
            .await;
        tracing::debug!(%level, "Upscale recorded");
        Ok(level)
    }
}

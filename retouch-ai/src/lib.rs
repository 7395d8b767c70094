//! # Retouch AI
//!
//! Gateway between the editor and an external image model.
//!
//! ```text
//! ┌──────────────┐   retry(policy)   ┌─────────────────┐
//! │ AiToolGateway│ ────────────────▶ │ dyn AiService   │
//! │              │                   │ (HTTP / offline)│
//! │              │ ◀── fallback ──── └─────────────────┘
//! │              │   radial mask
//! └──────────────┘
//! ```
//!
//! Only quota and rate-limit failures are retried. Background removal
//! absorbs every other failure with a local fallback; the erase and upscale
//! tools run locally.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod gateway;
pub mod http;
pub mod retry;
pub mod service;

pub use error::{GatewayError, GatewayResult, ServiceError, ServiceErrorKind};
pub use gateway::{AiToolGateway, BackgroundRemoval, GatewayConfig, RemovalPath};
pub use http::HttpImageService;
pub use retry::{retry, RetryNotice, RetryOutcome, RetryPolicy, Retryable, Sleeper, TokioSleeper};
pub use service::{AiService, OfflineService, ServiceRequest, ServiceResponse};

//! HTTP client for a `generateContent`-style image model.
//!
//! The request carries the image as base64 `inlineData` next to a text
//! part; the reply's first candidate is searched for an `inlineData` part.

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GatewayError, GatewayResult, ServiceError};
use crate::service::{AiService, ServiceRequest, ServiceResponse};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// [`AiService`] speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpImageService {
    http: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpImageService {
    /// Create a client for `base_url` and `model`.
    ///
    /// `base_url` may be a full endpoint, or just the host (in which case
    /// `/v1beta/models/{model}:generateContent` is appended).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidUrl`] if the URL is malformed.
    /// Returns [`GatewayError::Http`] if the HTTP client fails to build.
    pub fn new(base_url: &str, model: &str, api_key: Option<String>) -> GatewayResult<Self> {
        let mut endpoint =
            Url::parse(base_url).map_err(|e| GatewayError::InvalidUrl(e.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(GatewayError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                endpoint.scheme()
            )));
        }
        if endpoint.path().is_empty() || endpoint.path() == "/" {
            endpoint.set_path(&format!("/v1beta/models/{model}:generateContent"));
        }

        let http = Client::builder()
            .user_agent(concat!("retouch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }

    /// The resolved endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 2],
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

#[async_trait]
impl AiService for HttpImageService {
    async fn edit_image(&self, request: &ServiceRequest) -> Result<ServiceResponse, ServiceError> {
        let engine = base64::engine::general_purpose::STANDARD;
        let body = GenerateRequest {
            contents: [Content {
                parts: [
                    RequestPart::Inline {
                        inline_data: InlineData {
                            mime_type: request.mime_type.clone(),
                            data: engine.encode(&request.image_bytes),
                        },
                    },
                    RequestPart::Text {
                        text: &request.instruction,
                    },
                ],
            }],
        };

        let mut builder = self.http.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        tracing::debug!(endpoint = %self.endpoint, bytes = request.image_bytes.len(), "Sending image request");
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| ServiceError::unknown(format!("malformed response: {e}")))?;

        let inline = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| content.parts.into_iter().find_map(|p| p.inline_data))
            .ok_or_else(|| ServiceError::unknown("response contained no image"))?;

        let image_bytes = engine
            .decode(inline.data.as_bytes())
            .map_err(|e| ServiceError::unknown(format!("invalid image payload: {e}")))?;
        if image_bytes.is_empty() {
            return Err(ServiceError::unknown("response contained an empty image"));
        }

        Ok(ServiceResponse {
            image_bytes,
            mime_type: inline.mime_type,
        })
    }
}

/// Turn a non-2xx reply into a classified error.
fn classify_failure(status: StatusCode, body: &str) -> ServiceError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body).map_or_else(
        |_| body.to_string(),
        |envelope| format!("{} {}", envelope.error.status, envelope.error.message),
    );
    let message = format!("HTTP {}: {}", status.as_u16(), detail.trim());

    if status == StatusCode::TOO_MANY_REQUESTS {
        ServiceError::rate_limited(message)
    } else {
        ServiceError::from_message(message)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::ServiceErrorKind;

    const MODEL_PATH: &str = "/v1beta/models/gemini-2.5-flash-image:generateContent";

    fn request() -> ServiceRequest {
        ServiceRequest {
            image_bytes: vec![1, 2, 3],
            mime_type: "image/png".to_string(),
            instruction: "Remove the background".to_string(),
        }
    }

    async fn service_for(server: &MockServer) -> HttpImageService {
        HttpImageService::new(&server.uri(), DEFAULT_MODEL, Some("secret".to_string()))
            .expect("client")
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            HttpImageService::new("not a url", DEFAULT_MODEL, None),
            Err(GatewayError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpImageService::new("ftp://example.com", DEFAULT_MODEL, None),
            Err(GatewayError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_full_endpoint_kept() {
        let service =
            HttpImageService::new("https://example.com/custom/edit", DEFAULT_MODEL, None).unwrap();
        assert_eq!(service.endpoint().path(), "/custom/edit");
    }

    #[test]
    fn test_classify_error_envelope() {
        let body = json!({
            "error": { "code": 400, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
        })
        .to_string();
        let err = classify_failure(StatusCode::BAD_REQUEST, &body);
        assert_eq!(err.kind, ServiceErrorKind::RateLimited);

        let err = classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(err.kind, ServiceErrorKind::Unknown);
        assert_eq!(err.message, "HTTP 500: boom");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn edit_image_returns_inline_data() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header(API_KEY_HEADER, "secret"))
            .and(body_string_contains("Remove the background"))
            .and(body_string_contains("AQID"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {
                        "parts": [
                            { "text": "Here you go" },
                            { "inlineData": { "mimeType": "image/png", "data": "CQgH" } }
                        ]
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = service_for(&server).await.edit_image(&request()).await.unwrap();
        assert_eq!(response.image_bytes, vec![9, 8, 7]);
        assert_eq!(response.mime_type, "image/png");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn edit_image_maps_429_to_rate_limit() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = service_for(&server).await.edit_image(&request()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn edit_image_without_image_is_unknown() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "I cannot do that" }] } }]
            })))
            .mount(&server)
            .await;

        let err = service_for(&server).await.edit_image(&request()).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Unknown);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn edit_image_unreachable_is_network_error() {
        // Nothing listens on port 1; the connection is refused.
        let service = HttpImageService::new("http://127.0.0.1:1", DEFAULT_MODEL, None).unwrap();

        let err = service.edit_image(&request()).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Network);
    }
}

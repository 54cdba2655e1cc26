use bridgellm::clients::error_body;
use bridgellm::TransformError;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::{Response, StatusCode};
use thiserror::Error;

pub const INVALID_REQUEST_CODE: &str = "invalid_request_error";
pub const PROVIDER_ERROR_CODE: &str = "api_error";
pub const STREAM_ERROR_CODE: &str = "stream_error";
pub const INTERNAL_ERROR_CODE: &str = "internal_error";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Upstream provider error: {0}")]
    Provider(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Failed to create response: {0}")]
    ResponseCreationFailed(#[from] hyper::http::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Transform(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Provider(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Transform(e) => e.code(),
            GatewayError::InvalidRequest(_) => INVALID_REQUEST_CODE,
            GatewayError::Provider(_) => PROVIDER_ERROR_CODE,
            GatewayError::StreamError(_) => STREAM_ERROR_CODE,
            GatewayError::ResponseCreationFailed(_) | GatewayError::Config(_) => {
                INTERNAL_ERROR_CODE
            }
        }
    }

    pub fn into_response(self) -> Response<BoxBody<Bytes, hyper::Error>> {
        let status = self.status_code();
        let body = error_body(self.code(), &self.to_string());

        let body = Full::new(Bytes::from(body.to_string()))
            .map_err(|never| match never {})
            .boxed();

        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(body)
            .unwrap_or_else(|_| {
                Response::new(
                    Full::new(Bytes::from(r#"{"error":{"message":"internal error"}}"#))
                        .map_err(|never| match never {})
                        .boxed(),
                )
            })
    }
}

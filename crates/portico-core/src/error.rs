use bytes::Bytes;
use http::StatusCode;

#[derive(Debug)]
pub struct ProxyError {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ProxyError {
    pub fn not_found(message: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: message.into(),
        }
    }

    pub fn method_not_allowed(message: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            body: message.into(),
        }
    }

    pub fn too_many_requests(message: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            body: message.into(),
        }
    }
}

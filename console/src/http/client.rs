//! HTTP client implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, error};

use crate::errors::CloudError;
use crate::http::{HeaderBag, Method, RemoteAccess, Request, Response, SESSION_HEADER};

#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Applied to every request
    pub timeout: Duration,

    /// Accept self-signed server certificates
    pub accept_invalid_certs: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
        }
    }
}

/// HTTP client for the cloud API
pub struct HttpClient {
    client: Client,
    headers: HeaderBag,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(options: &HttpOptions) -> Result<Self, CloudError> {
        let client = Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            headers: HeaderBag::new(),
        })
    }

    fn method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl RemoteAccess for HttpClient {
    async fn send(&self, request: Request) -> Result<Response, CloudError> {
        debug!("{} {}", request.method.as_str(), request.url);

        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url)
            .headers(self.headers.snapshot());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            if let Some(content_type) = &request.content_type {
                builder = builder.header(header::CONTENT_TYPE, content_type.as_str());
            }
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let session_token = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED {
            error!("HTTP {} {} unauthorized", request.method.as_str(), request.url);
            return Err(CloudError::AuthFailure(body));
        }
        if !status.is_success() {
            error!(
                "HTTP {} {} failed: {} - {}",
                request.method.as_str(),
                request.url,
                status,
                body
            );
            return Err(CloudError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Response {
            status: status.as_u16(),
            body,
            session_token,
        })
    }

    fn set_header(&self, name: &str, value: &str) -> Result<(), CloudError> {
        self.headers.set(name, value)
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.contains(name)
    }

    fn remove_header(&self, name: &str) {
        self.headers.remove(name)
    }

    fn clear_headers(&self) {
        self.headers.clear()
    }
}

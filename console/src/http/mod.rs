//! Remote access layer

pub mod client;
pub mod headers;

pub use client::{HttpClient, HttpOptions};
pub use headers::HeaderBag;

use async_trait::async_trait;

use crate::errors::CloudError;

/// Response header carrying the session token
pub const SESSION_HEADER: &str = "x-vcloud-authorization";

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// A request against an absolute URL
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
    pub content_type: Option<String>,
    /// Headers for this request only, applied over the default bag
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            content_type: None,
            headers: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn with_body(mut self, body: impl Into<String>, content_type: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: String,
    /// Value of the session header, when the server sent one
    pub session_token: Option<String>,
}

/// Wrap a SOAP body in an envelope
pub fn soap_envelope(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
<soap:Envelope xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" \
xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">\
<soap:Body>{}</soap:Body></soap:Envelope>",
        body
    )
}

/// Transport used by the session. Implemented over HTTP by [`HttpClient`] and by
/// scripted fakes in tests.
#[async_trait]
pub trait RemoteAccess: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, CloudError>;

    fn set_header(&self, name: &str, value: &str) -> Result<(), CloudError>;
    fn has_header(&self, name: &str) -> bool;
    fn remove_header(&self, name: &str);
    fn clear_headers(&self);

    async fn get(&self, url: &str) -> Result<Response, CloudError> {
        self.send(Request::get(url)).await
    }

    async fn post(
        &self,
        url: &str,
        body: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Response, CloudError> {
        let mut request = Request::post(url);
        if let Some(body) = body {
            request = request.with_body(body, content_type.unwrap_or(SOAP_CONTENT_TYPE));
        }
        self.send(request).await
    }

    async fn put(&self, url: &str, body: &str, content_type: &str) -> Result<Response, CloudError> {
        self.send(Request::put(url).with_body(body, content_type)).await
    }

    async fn delete(&self, url: &str) -> Result<Response, CloudError> {
        self.send(Request::delete(url)).await
    }

    /// Legacy SOAP call: the body is wrapped in an envelope and posted with a SOAPAction
    async fn soap_post(&self, url: &str, action: &str, body: &str) -> Result<Response, CloudError> {
        let request = Request::post(url)
            .with_body(soap_envelope(body), SOAP_CONTENT_TYPE)
            .with_header("SOAPAction", action);
        self.send(request).await
    }
}

//! Scripted `RemoteAccess` fake

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use cloud_console::errors::CloudError;
use cloud_console::http::{HeaderBag, RemoteAccess, Request, Response};

/// A canned answer; errors are rebuilt on every use
#[derive(Debug, Clone)]
pub enum Reply {
    Ok { body: String, token: Option<String> },
    Status { status: u16, body: String },
    Unauthorized,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply::Ok {
            body: body.into(),
            token: None,
        }
    }

    fn to_result(&self) -> Result<Response, CloudError> {
        match self {
            Reply::Ok { body, token } => Ok(Response {
                status: 200,
                body: body.clone(),
                session_token: token.clone(),
            }),
            Reply::Status { status, body } => Err(CloudError::Status {
                status: *status,
                body: body.clone(),
            }),
            Reply::Unauthorized => Err(CloudError::AuthFailure("401 Unauthorized".to_string())),
        }
    }
}

/// What the fake saw
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub body: Option<String>,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
}

/// Replies keyed by `METHOD url`. Queued replies are consumed in order; the last one sticks.
#[derive(Default)]
pub struct ScriptedRemote {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<Recorded>>,
    headers: HeaderBag,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(method: &str, url: &str) -> String {
        format!("{} {}", method, url)
    }

    pub fn on(&self, method: &str, url: &str, reply: Reply) {
        let mut replies = self.replies.lock().unwrap();
        replies
            .entry(Self::key(method, url))
            .or_default()
            .push_back(reply);
    }

    /// Drop whatever was scripted for this request and answer with `reply` from now on
    pub fn replace(&self, method: &str, url: &str, reply: Reply) {
        let mut replies = self.replies.lock().unwrap();
        replies.insert(Self::key(method, url), VecDeque::from([reply]));
    }

    pub fn on_get(&self, url: &str, body: &str) {
        self.on("GET", url, Reply::ok(body));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, url: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name)
    }
}

#[async_trait]
impl RemoteAccess for ScriptedRemote {
    async fn send(&self, request: Request) -> Result<Response, CloudError> {
        let method = request.method.as_str().to_string();
        self.requests.lock().unwrap().push(Recorded {
            method: method.clone(),
            url: request.url.clone(),
            body: request.body.clone(),
            content_type: request.content_type.clone(),
            headers: request.headers.clone(),
        });

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(&Self::key(&method, &request.url)) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        match reply {
            Some(reply) => reply.to_result(),
            None => Err(CloudError::Status {
                status: 404,
                body: format!("no reply scripted for {} {}", method, request.url),
            }),
        }
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

/*!
Mock HTTP transport for developing without a device

Answers requests from scripted replies keyed by path (with query string)
and records every request, so tests can check what reached the device and
with which cookie.
*/

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thecus_core::{CheckError, HttpRequest, HttpResponse, Method, Transport};

/// One scripted answer
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(HttpResponse),
    /// Connection-level failure (refused, timeout, ...)
    Failure(String),
}

impl MockReply {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        MockReply::Response(HttpResponse {
            status,
            body: body.into(),
            ..Default::default()
        })
    }

    pub fn json(value: Value) -> Self {
        Self::status(200, value.to_string())
    }

    /// Raw 200 body, e.g. broken JSON
    pub fn text(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    pub fn redirect(status: u16, location: impl Into<String>) -> Self {
        MockReply::Response(HttpResponse {
            status,
            location: Some(location.into()),
            ..Default::default()
        })
    }

    /// Page the device serves in place of data once the session is gone
    pub fn logged_out() -> Self {
        Self::text("<html><script>top.location='/adm/logout.php';</script></html>")
    }

    pub fn failure(message: impl Into<String>) -> Self {
        MockReply::Failure(message.into())
    }

    /// Adds a `Set-Cookie` header to the reply
    pub fn with_cookie(mut self, set_cookie: impl Into<String>) -> Self {
        if let MockReply::Response(response) = &mut self {
            response.set_cookies.push(set_cookie.into());
        }
        self
    }
}

#[derive(Default)]
struct Routes {
    /// One-shot replies, consumed in order
    queued: HashMap<String, VecDeque<MockReply>>,
    /// Replies served whenever the queue of a path is empty
    fixed: HashMap<String, MockReply>,
}

/// Mock transport standing in for `ReqwestTransport`
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<Routes>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues replies for `path`, served once each in order
    pub fn script<I>(&self, path: &str, replies: I) -> &Self
    where
        I: IntoIterator<Item = MockReply>,
    {
        self.routes
            .lock()
            .queued
            .entry(path.to_string())
            .or_default()
            .extend(replies);
        self
    }

    /// Serves `reply` for `path` every time nothing is queued
    pub fn route(&self, path: &str, reply: MockReply) -> &Self {
        self.routes.lock().fixed.insert(path.to_string(), reply);
        self
    }

    pub fn route_json(&self, path: &str, value: Value) -> &Self {
        self.route(path, MockReply::json(value))
    }

    /// All requests seen so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Paths (with query) of all requests seen so far
    pub fn paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|request| path_of(&request.url).to_string())
            .collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| path_of(&request.url) == path)
            .count()
    }

    /// Cookie header sent with the most recent request to `path`
    pub fn last_cookie(&self, path: &str) -> Option<String> {
        self.requests
            .lock()
            .iter()
            .rev()
            .find(|request| path_of(&request.url) == path)
            .and_then(|request| request.cookie.clone())
    }

    pub fn clear(&self) {
        self.requests.lock().clear();
        let mut routes = self.routes.lock();
        routes.queued.clear();
        routes.fixed.clear();
    }

    fn next_reply(&self, path: &str) -> MockReply {
        let mut routes = self.routes.lock();
        if let Some(reply) = routes.queued.get_mut(path).and_then(VecDeque::pop_front) {
            return reply;
        }
        routes
            .fixed
            .get(path)
            .cloned()
            .unwrap_or_else(|| MockReply::status(404, "<html>404 Not Found</html>"))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> thecus_core::Result<HttpResponse> {
        let path = path_of(&request.url).to_string();
        log::info!(
            "🔌 [MOCK] {} {}",
            if request.method == Method::Post { "POST" } else { "GET" },
            path
        );
        self.requests.lock().push(request);

        match self.next_reply(&path) {
            MockReply::Response(response) => Ok(response),
            MockReply::Failure(message) => Err(CheckError::Transport(message)),
        }
    }
}

/// Path and query of an absolute URL
fn path_of(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    match rest.find('/') {
        Some(i) => &rest[i..],
        None => "/",
    }
}

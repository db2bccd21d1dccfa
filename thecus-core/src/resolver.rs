//! Endpoint fallback across firmware generations
//!
//! The same logical data lives under different paths (or parameter names) on
//! different device generations, and some endpoints answer with broken or
//! empty payloads. A query therefore carries an ordered list of candidates:
//! endpoint-local failures move on to the next one, anything else aborts the
//! whole query because another path cannot fix it.

use crate::device::DeviceResponse;
use crate::error::{CheckError, Result};
use crate::session::SessionClient;
use crate::transport::Transport;
use async_trait::async_trait;
use tracing::{debug, warn};

/// One logical device query
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointQuery {
    name: String,
    candidates: Vec<String>,
    post_body: Option<String>,
    allow_auto_login: bool,
    collect_all: bool,
}

impl EndpointQuery {
    /// A query always has at least its first candidate
    pub fn new(name: impl Into<String>, first: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            candidates: vec![first.into()],
            post_body: None,
            allow_auto_login: true,
            collect_all: false,
        }
    }

    /// Adds a fallback candidate, tried after the ones already present
    pub fn or(mut self, candidate: impl Into<String>) -> Self {
        self.candidates.push(candidate.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.post_body = Some(body.into());
        self
    }

    pub fn without_auto_login(mut self) -> Self {
        self.allow_auto_login = false;
        self
    }

    /// Queries every candidate and keeps all successful answers
    pub fn collecting_all(mut self) -> Self {
        self.collect_all = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn post_body(&self) -> Option<&str> {
        self.post_body.as_deref()
    }

    pub fn allow_auto_login(&self) -> bool {
        self.allow_auto_login
    }

    pub fn collect_all(&self) -> bool {
        self.collect_all
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Single(DeviceResponse),
    All(Vec<DeviceResponse>),
}

impl Resolved {
    pub fn into_vec(self) -> Vec<DeviceResponse> {
        match self {
            Resolved::Single(response) => vec![response],
            Resolved::All(responses) => responses,
        }
    }
}

/// Anything that can answer a single device path
#[async_trait]
pub trait DeviceSource: Send {
    async fn query(
        &mut self,
        path: &str,
        body: Option<&str>,
        allow_auto_login: bool,
    ) -> Result<DeviceResponse>;
}

#[async_trait]
impl<T: Transport> DeviceSource for SessionClient<T> {
    async fn query(
        &mut self,
        path: &str,
        body: Option<&str>,
        allow_auto_login: bool,
    ) -> Result<DeviceResponse> {
        self.request_with(path, body, allow_auto_login).await
    }
}

pub struct EndpointFallbackResolver<S: DeviceSource> {
    source: S,
}

impl<S: DeviceSource> EndpointFallbackResolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    pub async fn resolve(&mut self, query: &EndpointQuery) -> Result<Resolved> {
        let mut collected = Vec::new();

        for (attempt, candidate) in query.candidates().iter().enumerate() {
            let outcome = self
                .source
                .query(candidate, query.post_body(), query.allow_auto_login())
                .await;

            match outcome {
                Ok(response) if !query.collect_all() => {
                    if attempt > 0 {
                        debug!("{} answered by fallback {}", query.name(), candidate);
                    }
                    return Ok(Resolved::Single(response));
                }
                Ok(response) => collected.push(response),
                Err(e) if e.is_endpoint_local() => {
                    debug!("{}: candidate {} skipped ({})", query.name(), candidate, e);
                }
                Err(e) => {
                    warn!("{}: aborting on {} ({})", query.name(), candidate, e);
                    return Err(e);
                }
            }
        }

        if collected.is_empty() {
            warn!("{}: no candidate endpoint answered", query.name());
            return Err(CheckError::NoEndpointSatisfied {
                query: query.name().to_string(),
                attempts: query.candidates().len(),
            });
        }
        Ok(Resolved::All(collected))
    }

    /// First usable answer
    pub async fn fetch(&mut self, query: &EndpointQuery) -> Result<DeviceResponse> {
        match self.resolve(query).await? {
            Resolved::Single(response) => Ok(response),
            Resolved::All(responses) => responses.into_iter().next().ok_or_else(|| {
                CheckError::NoEndpointSatisfied {
                    query: query.name().to_string(),
                    attempts: query.candidates().len(),
                }
            }),
        }
    }

    /// Every usable answer, in candidate order
    pub async fn fetch_all(&mut self, query: &EndpointQuery) -> Result<Vec<DeviceResponse>> {
        Ok(self.resolve(query).await?.into_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = EndpointQuery::new("disk list", "/a")
            .or("/b")
            .with_body("x=1")
            .without_auto_login()
            .collecting_all();
        assert_eq!(query.candidates(), &["/a".to_string(), "/b".to_string()]);
        assert_eq!(query.post_body(), Some("x=1"));
        assert!(!query.allow_auto_login());
        assert!(query.collect_all());
    }

    #[test]
    fn test_resolved_into_vec() {
        let one = DeviceResponse::new(serde_json::json!({"a": 1}));
        assert_eq!(Resolved::Single(one.clone()).into_vec(), vec![one]);
    }
}

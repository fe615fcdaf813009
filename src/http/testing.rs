//! Scripted [`HttpClient`] for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{HttpClient, HttpRequest, HttpResponse};
use crate::error::ProviderError;

/// Answers requests from a list of `(url fragment, response)` routes.
///
/// The first route whose fragment occurs in the request URL wins. Requests
/// with no route fail as transport errors. Every request is recorded.
#[derive(Default)]
pub struct StubHttp {
    routes: Mutex<Vec<(String, Option<HttpResponse>)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, fragment: &str, status: u16, body: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .push((fragment.to_string(), Some(HttpResponse::new(status, body))));
        self
    }

    /// Requests matching `fragment` fail at the transport level.
    pub fn fail(self, fragment: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .push((fragment.to_string(), None));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl HttpClient for StubHttp {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let routes = self.routes.lock().unwrap();
        match routes.iter().find(|(fragment, _)| request.url.contains(fragment.as_str())) {
            Some((_, Some(response))) => Ok(response.clone()),
            _ => Err(ProviderError::Transport {
                url: request.url,
                reason: "no route".into(),
            }),
        }
    }
}

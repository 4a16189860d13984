// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scripted transport fake.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use messagix_client::{HttpRequest, HttpResponse, Transport, TransportError};

/// Replays queued responses in order and records every request.
///
/// When the script runs dry, calls fail with a network error. Clones share
/// the script and the request log.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    script: VecDeque<Result<HttpResponse, TransportError>>,
    requests: Vec<HttpRequest>,
}

impl MockTransport {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a `200` with `body`.
    pub fn respond(&self, body: impl Into<Vec<u8>>) -> &Self {
        self.respond_with(HttpResponse::ok(body))
    }

    /// Queue a full response.
    pub fn respond_with(&self, response: HttpResponse) -> &Self {
        self.lock().script.push_back(Ok(response));
        self
    }

    /// Queue a transport failure.
    pub fn fail(&self, err: TransportError) -> &Self {
        self.lock().script.push_back(Err(err));
        self
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    /// Number of requests seen so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Form fields of the `index`th request, decoded.
    pub fn form(&self, index: usize) -> Vec<(String, String)> {
        self.lock()
            .requests
            .get(index)
            .map(|req| decode_form(&req.body))
            .unwrap_or_default()
    }
}

impl Transport for MockTransport {
    fn post(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        let mut inner = self.lock();
        inner.requests.push(request);
        let next = inner
            .script
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("mock script exhausted".into())));
        std::future::ready(next)
    }
}

/// Decode an `application/x-www-form-urlencoded` body.
pub fn decode_form(body: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str(body).unwrap_or_default()
}

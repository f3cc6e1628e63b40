//! In-process `Fetch` for tests, here and in dependent crates (`testing` feature).

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::fetch::{Fetch, FetchRequest, FetchResponse, ResponseSource};
use precache_core::Error;

#[derive(Debug, Clone)]
enum Reply {
    Respond(u16, String),
    Fail,
}

/// Replays canned responses and counts calls.
///
/// Per-path routes answer every time; otherwise queued replies are consumed
/// in order. With nothing left to answer, the fetch fails as if offline.
#[derive(Default)]
pub struct ScriptedFetch {
    routes: Mutex<HashMap<String, Reply>>,
    queue: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedFetch {
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn then_ok(self, body: &str) -> Self {
        self.then_status(200, body)
    }

    pub fn then_status(self, status: u16, body: &str) -> Self {
        self.queue.lock().unwrap().push_back(Reply::Respond(status, body.to_string()));
        self
    }

    pub fn then_fail(self) -> Self {
        self.queue.lock().unwrap().push_back(Reply::Fail);
        self
    }

    pub fn route(self, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Reply::Respond(status, body.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for ScriptedFetch {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.url.to_string());

        let routed = self.routes.lock().unwrap().get(request.url.path()).cloned();
        let reply = routed.or_else(|| self.queue.lock().unwrap().pop_front());

        match reply {
            Some(Reply::Respond(status, body)) => {
                let status = StatusCode::from_u16(status).unwrap();
                let mut response = FetchResponse::synthesized(&request.url, status, "text/plain", body);
                response.source = ResponseSource::Network;
                Ok(response)
            }
            Some(Reply::Fail) | None => Err(Error::NetworkFailure(format!("{}: offline", request.url))),
        }
    }
}

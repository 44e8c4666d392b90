use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use wallet_adapter::rpc::{HttpResponse, HttpTransport, RequestError};

/// Serves canned responses per URL and records every request.
#[derive(Default)]
pub struct InMemoryTransport {
    routes: Mutex<BTreeMap<String, VecDeque<Result<HttpResponse, RequestError>>>>,
    requests: Mutex<Vec<(String, Option<Value>)>>,
}

impl InMemoryTransport {
    pub fn respond(&self, url: &str, response: Result<HttpResponse, RequestError>) {
        self.routes
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<(String, Option<Value>)> {
        self.requests.lock().clone()
    }

    fn answer(&self, url: &str, body: Option<&Value>) -> Result<HttpResponse, RequestError> {
        self.requests
            .lock()
            .push((url.to_string(), body.cloned()));
        self.routes
            .lock()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(RequestError::Network(format!("no route for {url}"))))
    }
}

#[async_trait]
impl HttpTransport for InMemoryTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, RequestError> {
        self.answer(url, None)
    }

    async fn post(&self, url: &str, body: &Value) -> Result<HttpResponse, RequestError> {
        self.answer(url, Some(body))
    }
}

//! Scripted transport for tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use crate::transport::{HttpResponse, HttpTransport, LogicalRequest, TransportError};

type Handler = dyn Fn(&LogicalRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Transport that answers from a closure and records every physical request.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<LogicalRequest>>,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&LogicalRequest) -> Result<HttpResponse, TransportError>
        + Send
        + Sync
        + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<LogicalRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// URLs of every request sent so far, in order.
    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    /// Number of requests whose URL contains `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.contains(needle))
            .count()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(
        &self,
        request: LogicalRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + '_>> {
        let result = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        Box::pin(async move { result })
    }
}

//! In-memory transport and stores for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use futures::future::{self, BoxFuture, FutureExt};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use super::request::{ApiRequest, ApiResponse};
use crate::auth::{CredentialStore, MemoryStore, StoreError};
use super::transport::Transport;
use super::ApiError;

/// A scripted reply: the status decides success or `ApiError::Status`
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
}

type Route = Box<dyn Fn(&ApiRequest) -> Reply + Send + Sync>;

/// Records every request and answers from a queue or a routing function.
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Reply>>,
    route: Option<Route>,
    sent: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            route: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn routed(route: impl Fn(&ApiRequest) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            route: Some(Box::new(route)),
            ..Self::new()
        }
    }

    pub fn push_ok(&self, body: &str) {
        self.push_status(StatusCode::OK, body);
    }

    pub fn push_status(&self, status: StatusCode, body: &str) {
        self.queue.lock().unwrap().push_back(Reply {
            status,
            body: body.to_string(),
        });
    }

    pub fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().unwrap().clone()
    }

    fn reply_for(&self, request: &ApiRequest) -> Reply {
        match self.route {
            Some(ref route) => route(request),
            None => self.queue.lock().unwrap().pop_front().unwrap_or(Reply {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "unscripted request".to_string(),
            }),
        }
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, ApiError>> {
        self.sent.lock().unwrap().push(request.clone());
        let reply = self.reply_for(&request);
        let result = if reply.status.is_success() {
            Ok(ApiResponse {
                status: reply.status,
                headers: HeaderMap::new(),
                body: reply.body.into_bytes(),
            })
        } else {
            Err(ApiError::from_status(reply.status, reply.body.as_bytes(), request))
        };
        future::ready(result).boxed()
    }
}

/// A `MemoryStore` that fails reads once its budget is spent, and
/// optionally every write.
pub struct FlakyStore {
    inner: MemoryStore,
    reads_left: Mutex<Option<usize>>,
    fail_writes: bool,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            reads_left: Mutex::new(None),
            fail_writes: false,
        }
    }

    /// Allow `reads` successful reads, then fail every read
    pub fn failing_reads_after(self, reads: usize) -> Self {
        *self.reads_left.lock().unwrap() = Some(reads);
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
}

impl CredentialStore for FlakyStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        {
            let mut reads_left = self.reads_left.lock().unwrap();
            match *reads_left {
                Some(0) => return future::ready(Err(StoreError::read(key, "keychain locked"))).boxed(),
                Some(ref mut n) => *n -= 1,
                None => {}
            }
        }
        self.inner.get(key)
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        if self.fail_writes {
            return future::ready(Err(StoreError::write(key, "disk full"))).boxed();
        }
        self.inner.set(key, value)
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        self.inner.remove(key)
    }
}

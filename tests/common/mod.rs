//! Shared helpers for integration tests: a scripted in-memory transport

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use redquery::cache::QueryClient;
use redquery::config::CacheConfig;
use redquery::transport::{RequestDescriptor, Transport, TransportError};

pub type Reply = Result<Value, TransportError>;

/// One scripted answer
pub enum Step {
    /// Answers as soon as the request is made
    Ready(Reply),
    /// Answers when the paired sender fires
    Gated(oneshot::Receiver<Reply>),
}

/// Transport that answers requests from a queue, in order
#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<RequestDescriptor>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_ok(&self, payload: Value) {
        self.push(Step::Ready(Ok(payload)));
    }

    pub fn push_err(&self, err: TransportError) {
        self.push(Step::Ready(Err(err)));
    }

    /// Queues a reply that waits for the returned sender
    pub fn push_gated(&self) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.push(Step::Gated(rx));
        tx
    }

    fn push(&self, step: Step) {
        self.steps.lock().unwrap().push_back(step);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests.lock().unwrap().clone()
    }

    /// Waits until at least `n` calls were made, failing the test after a second
    pub async fn wait_for_calls(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while self.calls() < n {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("expected {} calls, saw {}", n, self.calls()));
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: RequestDescriptor) -> BoxFuture<'static, Reply> {
        self.requests.lock().unwrap().push(request);
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();

        async move {
            match step {
                Some(Step::Ready(reply)) => reply,
                Some(Step::Gated(rx)) => rx
                    .await
                    .unwrap_or_else(|_| Err(TransportError::network("gate dropped"))),
                None => Err(TransportError::network("no scripted reply")),
            }
        }
        .boxed()
    }
}

pub fn client(transport: &Arc<ScriptedTransport>) -> QueryClient {
    QueryClient::new(transport.clone(), CacheConfig::default())
}

/// Listing payload with one post per `(id, title, score)`
pub fn posts_payload(posts: &[(&str, &str, i64)]) -> Value {
    let children: Vec<Value> = posts
        .iter()
        .map(|(id, title, score)| json!({"kind": "t3", "data": {"id": id, "title": title, "score": score}}))
        .collect();
    json!({"kind": "Listing", "data": {"children": children, "after": null}})
}

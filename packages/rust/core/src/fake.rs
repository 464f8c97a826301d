//! Scripted [`ModelProvider`] for tests.
//!
//! Replies and stream scripts are consumed in the order they were queued.
//! Every request is recorded so tests can inspect the prompts a step built.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use bidcraft_provider::{CompletionRequest, FragmentStream, ModelProvider, StreamItem};
use bidcraft_shared::{BidcraftError, Result};

enum StreamScript {
    Open {
        items: Vec<Result<StreamItem>>,
        hang: bool,
    },
    Refuse(String),
}

/// A provider that plays back queued replies and stream scripts.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String>>>,
    streams: Mutex<VecDeque<StreamScript>>,
    calls: Mutex<Vec<CompletionRequest>>,
    open_sessions: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful `complete` reply.
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        lock(&self.replies).push_back(Ok(text.into()));
        self
    }

    /// Queue a failing `complete` call.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        lock(&self.replies).push_back(Err(BidcraftError::provider(message)));
        self
    }

    /// Queue a streaming session that yields `items` and then ends.
    pub fn with_stream(self, items: Vec<Result<StreamItem>>) -> Self {
        lock(&self.streams).push_back(StreamScript::Open { items, hang: false });
        self
    }

    /// Queue a streaming session that yields `items` and then never ends.
    pub fn with_hanging_stream(self, items: Vec<Result<StreamItem>>) -> Self {
        lock(&self.streams).push_back(StreamScript::Open { items, hang: true });
        self
    }

    /// Queue a streaming session that fails to open.
    pub fn with_stream_refusal(self, message: impl Into<String>) -> Self {
        lock(&self.streams).push_back(StreamScript::Refuse(message.into()));
        self
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<CompletionRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Streaming sessions handed out and not yet dropped.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        lock(&self.calls).push(request.clone());
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Err(BidcraftError::provider("no scripted reply left")))
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream> {
        lock(&self.calls).push(request.clone());
        let script = lock(&self.streams).pop_front();
        let (items, hang) = match script {
            Some(StreamScript::Open { items, hang }) => (items, hang),
            Some(StreamScript::Refuse(message)) => return Err(BidcraftError::provider(message)),
            None => return Err(BidcraftError::provider("no scripted stream left")),
        };

        let guard = SessionGuard::open(self.open_sessions.clone());
        let tail: FragmentStream = if hang {
            stream::pending().boxed()
        } else {
            stream::empty().boxed()
        };
        Ok(stream::iter(items)
            .chain(tail)
            .map(move |item| {
                let _held = &guard;
                item
            })
            .boxed())
    }
}

/// Counts a session as open until the stream holding it is dropped.
struct SessionGuard(Arc<AtomicUsize>);

impl SessionGuard {
    fn open(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

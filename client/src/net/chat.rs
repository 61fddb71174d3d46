//! Chat and action-planner client with a local conversation cache.
//!
//! SYSTEM CONTEXT
//! ==============
//! The backend owns conversations; this cache mirrors the open one so a UI
//! can redraw without a round trip. The planner assigns a `session_id` on the
//! first exchange and expects it back on every later one.

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use contract::{ChatReply, ChatRequest, ChatRole, ConversationMessage, PlanRequest, PlanResponse, paths};
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::http::{HttpClient, RequestOptions};
use crate::error::ClientError;

#[derive(Clone, Debug, Default)]
struct Conversation {
    session_id: Option<String>,
    messages: Vec<ConversationMessage>,
}

#[derive(Clone)]
pub struct ChatClient {
    http: HttpClient,
    conversation: Arc<Mutex<Conversation>>,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

impl ChatClient {
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self { http, conversation: Arc::new(Mutex::new(Conversation::default())) }
    }

    /// Continue a planner conversation started elsewhere.
    #[must_use]
    pub fn resume(http: HttpClient, session_id: impl Into<String>) -> Self {
        let client = Self::new(http);
        client.with_conversation(|c| c.session_id = Some(session_id.into()));
        client
    }

    fn with_conversation<R>(&self, f: impl FnOnce(&mut Conversation) -> R) -> R {
        match self.conversation.lock() {
            Ok(mut c) => f(&mut c),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn push(&self, role: ChatRole, content: &str) {
        let message = ConversationMessage { role, content: content.to_owned(), timestamp: now_ms() };
        self.with_conversation(|c| c.messages.push(message));
    }

    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.with_conversation(|c| c.session_id.clone())
    }

    #[must_use]
    pub fn messages(&self) -> Vec<ConversationMessage> {
        self.with_conversation(|c| c.messages.clone())
    }

    /// Forget the cached conversation and start a new one on the next plan.
    pub fn reset(&self) {
        self.with_conversation(|c| *c = Conversation::default());
    }

    /// `POST /api/chat`. Returns the assistant's reply text.
    ///
    /// # Errors
    ///
    /// Returns the request error, or [`ClientError::Decode`] when the reply
    /// carries neither `response` nor `message`.
    pub async fn send(&self, message: &str) -> Result<String, ClientError> {
        let body = ChatRequest { message: message.to_owned(), local_time: None };
        let reply: ChatReply = self.http.post(paths::CHAT, &body).await?;
        let text = reply
            .text()
            .ok_or_else(|| ClientError::Decode("chat reply has no response text".to_owned()))?
            .to_owned();
        self.push(ChatRole::User, message);
        self.push(ChatRole::Assistant, &text);
        Ok(text)
    }

    /// `POST /api/ai/plan` in the cached conversation.
    ///
    /// # Errors
    ///
    /// See [`ChatClient::plan_with`].
    pub async fn plan(&self, message: &str) -> Result<PlanResponse, ClientError> {
        self.plan_with(message, None).await
    }

    /// [`ChatClient::plan`] with a cancellation token. A cancelled plan leaves
    /// the cache as it was.
    ///
    /// # Errors
    ///
    /// Returns the request error or [`ClientError::Cancelled`].
    pub async fn plan_with(&self, message: &str, cancel: Option<CancellationToken>) -> Result<PlanResponse, ClientError> {
        let body = PlanRequest { message: message.to_owned(), session_id: self.session_id() };
        let opts = RequestOptions::default().with_cancel(cancel);
        let plan: PlanResponse = self.http.send(Method::POST, paths::AI_PLAN, Some(&body), opts).await?;

        self.push(ChatRole::User, message);
        if !plan.assistant_response.is_empty() {
            self.push(ChatRole::Assistant, &plan.assistant_response);
        }
        if let Some(id) = plan.session_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            debug!(session_id = id, "chat: planner conversation");
            let id = id.to_owned();
            self.with_conversation(|c| c.session_id = Some(id));
        }
        Ok(plan)
    }
}

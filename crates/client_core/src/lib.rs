use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{ChatMessage, SessionId, SessionStatus},
    protocol::{AskRequest, LoadUrlRequest},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub mod backend;
pub mod config;
pub mod error;
pub mod page;
mod session;

pub use backend::HttpQaBackend;
pub use error::BackendError;
pub use session::{
    ChatSession, SessionSnapshot, Transition, UiEffect, GREETING, UNSUPPORTED_PAGE_MESSAGE,
};

/// Host environment query for the page the user is looking at.
#[async_trait]
pub trait ActiveTabSource: Send + Sync {
    async fn active_tab_url(&self) -> Option<String>;
}

/// The two backend operations the controller depends on.
#[async_trait]
pub trait QaBackend: Send + Sync {
    async fn load_url(&self, request: &LoadUrlRequest) -> Result<(), BackendError>;
    async fn ask(&self, request: &AskRequest) -> Result<String, BackendError>;
}

/// Rendering sink. The controller never reads anything back from it.
pub trait ChatView: Send + Sync {
    fn render_message(&self, message: &ChatMessage);
    fn show_typing(&self);
    fn hide_typing(&self);
    fn set_status(&self, status: SessionStatus, label: &str);
    fn set_retry_visible(&self, visible: bool);
    fn set_input_enabled(&self, enabled: bool);
    fn clear_input(&self) {}
    fn show_page(&self, _host: &str) {}
}

impl UiEffect {
    pub fn apply(&self, view: &dyn ChatView) {
        match self {
            UiEffect::RenderMessage(message) => view.render_message(message),
            UiEffect::ShowTyping => view.show_typing(),
            UiEffect::HideTyping => view.hide_typing(),
            UiEffect::SetStatus { status, label } => view.set_status(*status, label),
            UiEffect::SetRetryVisible(visible) => view.set_retry_visible(*visible),
            UiEffect::SetInputEnabled(enabled) => view.set_input_enabled(*enabled),
            UiEffect::ClearInput => view.clear_input(),
            UiEffect::ShowPage(host) => view.show_page(host),
        }
    }
}

/// Owns the chat session and is the only caller of the backend.
///
/// The state lock is never held across a backend call, so a second
/// `submit_question` issued while one is outstanding observes
/// `awaiting_answer` and is dropped.
pub struct SessionController {
    backend: Arc<dyn QaBackend>,
    tabs: Arc<dyn ActiveTabSource>,
    view: Arc<dyn ChatView>,
    inner: Mutex<ChatSession>,
}

impl SessionController {
    pub fn new(
        backend: Arc<dyn QaBackend>,
        tabs: Arc<dyn ActiveTabSource>,
        view: Arc<dyn ChatView>,
    ) -> Arc<Self> {
        Arc::new(Self {
            backend,
            tabs,
            view,
            inner: Mutex::new(ChatSession::default()),
        })
    }

    /// Binds a fresh session to the active page. Used on startup and retry.
    pub async fn initialize(&self) {
        {
            let mut guard = self.inner.lock().await;
            let effects = guard.start_loading();
            self.render(&effects);
        }

        let url = self.tabs.active_tab_url().await;
        debug!(url = url.as_deref().unwrap_or(""), "resolved active tab");

        let request = {
            let mut guard = self.inner.lock().await;
            let transition = guard.bind_page(url.as_deref(), SessionId::generate());
            self.render(&transition.effects);
            transition.request
        };
        let Some(request) = request else {
            warn!(
                url = url.as_deref().unwrap_or(""),
                "active page is not supported; no session bound"
            );
            return;
        };

        info!(
            session_id = %request.session_id,
            url = %request.url,
            "binding session to page"
        );
        let outcome = self.backend.load_url(&request).await;
        match &outcome {
            Ok(()) => info!(session_id = %request.session_id, "session bound"),
            Err(error) => warn!(
                session_id = %request.session_id,
                status = error.status(),
                %error,
                "bind-session failed"
            ),
        }

        let mut guard = self.inner.lock().await;
        let effects = guard.finish_bind(&request.session_id, outcome);
        if effects.is_empty() {
            debug!(
                session_id = %request.session_id,
                "bind completion superseded by a newer session"
            );
        }
        self.render(&effects);
    }

    /// Sends one question. Returns `false` when the submission was a no-op.
    pub async fn submit_question(&self, text: &str) -> bool {
        let request = {
            let mut guard = self.inner.lock().await;
            let transition = guard.begin_question(text);
            self.render(&transition.effects);
            transition.request
        };
        let Some(request) = request else {
            return false;
        };

        debug!(session_id = %request.session_id, "asking question");
        let outcome = self.backend.ask(&request).await;
        if let Err(error) = &outcome {
            warn!(
                session_id = %request.session_id,
                status = error.status(),
                %error,
                "ask failed"
            );
        }

        let mut guard = self.inner.lock().await;
        let effects = guard.finish_question(outcome);
        self.render(&effects);
        true
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.snapshot()
    }

    pub async fn status(&self) -> Option<SessionStatus> {
        self.inner.lock().await.status()
    }

    pub async fn retry_visible(&self) -> bool {
        self.inner.lock().await.retry_visible()
    }

    pub async fn awaiting_answer(&self) -> bool {
        self.inner.lock().await.awaiting_answer()
    }

    fn render(&self, effects: &[UiEffect]) {
        for effect in effects {
            effect.apply(self.view.as_ref());
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

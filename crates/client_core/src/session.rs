//! Pure session state machine: every transition mutates a [`ChatSession`] and
//! returns the UI effects the controller must render, in order.

use shared::{
    domain::{ChatMessage, SessionId, SessionStatus},
    protocol::{AskRequest, LoadUrlRequest},
};

use crate::{error::BackendError, page};

pub const GREETING: &str = "Hi! I've analyzed this webpage and I'm ready to answer your questions about it. What would you like to know?";
pub const UNSUPPORTED_PAGE_MESSAGE: &str =
    "This extension cannot work on Chrome internal pages. Please navigate to a regular webpage.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    RenderMessage(ChatMessage),
    ShowTyping,
    HideTyping,
    SetStatus {
        status: SessionStatus,
        label: &'static str,
    },
    SetRetryVisible(bool),
    SetInputEnabled(bool),
    ClearInput,
    ShowPage(String),
}

/// Output of a transition that may issue a backend request.
#[derive(Debug)]
pub struct Transition<R> {
    pub request: Option<R>,
    pub effects: Vec<UiEffect>,
}

impl<R> Transition<R> {
    fn noop() -> Self {
        Self {
            request: None,
            effects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: Option<SessionStatus>,
    pub session_id: Option<SessionId>,
    pub page_url: Option<String>,
    pub transcript: Vec<ChatMessage>,
    pub awaiting_answer: bool,
    pub retry_visible: bool,
}

#[derive(Debug, Default)]
pub struct ChatSession {
    status: Option<SessionStatus>,
    session_id: Option<SessionId>,
    page_url: Option<String>,
    transcript: Vec<ChatMessage>,
    awaiting_answer: bool,
    retry_visible: bool,
}

impl ChatSession {
    pub fn status(&self) -> Option<SessionStatus> {
        self.status
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn awaiting_answer(&self) -> bool {
        self.awaiting_answer
    }

    pub fn retry_visible(&self) -> bool {
        self.retry_visible
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            session_id: self.session_id.clone(),
            page_url: self.page_url.clone(),
            transcript: self.transcript.clone(),
            awaiting_answer: self.awaiting_answer,
            retry_visible: self.retry_visible,
        }
    }

    /// First step of `initialize`: enter `Loading` and hide the retry affordance.
    /// The previous session id is forgotten, so any bind still in flight for it
    /// settles as stale.
    pub fn start_loading(&mut self) -> Vec<UiEffect> {
        let mut effects = Vec::new();
        self.session_id = None;
        self.set_status(SessionStatus::Loading, &mut effects);
        self.set_retry_visible(false, &mut effects);
        effects.push(UiEffect::SetInputEnabled(false));
        effects
    }

    /// Binds the session to the resolved page, or fails locally when the
    /// page is absent or restricted. The transcript is never cleared.
    pub fn bind_page(
        &mut self,
        url: Option<&str>,
        session_id: SessionId,
    ) -> Transition<LoadUrlRequest> {
        let mut effects = Vec::new();
        let Some(url) = url.filter(|url| page::is_supported_page_url(url)) else {
            self.fail(UNSUPPORTED_PAGE_MESSAGE.to_string(), &mut effects);
            return Transition {
                request: None,
                effects,
            };
        };

        self.page_url = Some(url.to_string());
        self.session_id = Some(session_id.clone());
        effects.push(UiEffect::ShowPage(page::display_host(url)));

        Transition {
            request: Some(LoadUrlRequest {
                session_id,
                url: url.to_string(),
            }),
            effects,
        }
    }

    /// Settles a bind-session call. Completions for a superseded session id
    /// are dropped so the state reflects the latest `initialize`.
    pub fn finish_bind(
        &mut self,
        session_id: &SessionId,
        outcome: Result<(), BackendError>,
    ) -> Vec<UiEffect> {
        let mut effects = Vec::new();
        if self.session_id.as_ref() != Some(session_id)
            || self.status != Some(SessionStatus::Loading)
        {
            return effects;
        }

        match outcome {
            Ok(()) => {
                self.set_status(SessionStatus::Ready, &mut effects);
                self.push_message(ChatMessage::bot(GREETING), &mut effects);
                effects.push(UiEffect::SetInputEnabled(true));
            }
            Err(err) => self.fail(format!("Failed to initialize: {err}"), &mut effects),
        }
        effects
    }

    /// Accepts a question only when the session is `Ready`, nothing is
    /// outstanding, and the trimmed text is non-empty.
    pub fn begin_question(&mut self, raw: &str) -> Transition<AskRequest> {
        let question = raw.trim();
        if question.is_empty()
            || self.awaiting_answer
            || self.status != Some(SessionStatus::Ready)
        {
            return Transition::noop();
        }
        let Some(session_id) = self.session_id.clone() else {
            return Transition::noop();
        };

        let mut effects = vec![UiEffect::ClearInput];
        self.awaiting_answer = true;
        effects.push(UiEffect::SetInputEnabled(false));
        self.push_message(ChatMessage::user(question), &mut effects);
        effects.push(UiEffect::ShowTyping);

        Transition {
            request: Some(AskRequest {
                session_id,
                question: question.to_string(),
            }),
            effects,
        }
    }

    /// Settles an ask call: exactly one bot message, then input is released.
    pub fn finish_question(&mut self, outcome: Result<String, BackendError>) -> Vec<UiEffect> {
        if !self.awaiting_answer {
            return Vec::new();
        }
        let mut effects = vec![UiEffect::HideTyping];
        let text = match outcome {
            Ok(answer) => answer,
            Err(err) => format!("Error: {err}"),
        };
        self.push_message(ChatMessage::bot(text), &mut effects);

        self.awaiting_answer = false;
        if self.status == Some(SessionStatus::Ready) {
            effects.push(UiEffect::SetInputEnabled(true));
        }
        effects
    }

    fn fail(&mut self, message: String, effects: &mut Vec<UiEffect>) {
        self.set_status(SessionStatus::Error, effects);
        self.push_message(ChatMessage::bot(message), effects);
        self.set_retry_visible(true, effects);
    }

    fn set_status(&mut self, status: SessionStatus, effects: &mut Vec<UiEffect>) {
        self.status = Some(status);
        effects.push(UiEffect::SetStatus {
            status,
            label: status.label(),
        });
    }

    fn set_retry_visible(&mut self, visible: bool, effects: &mut Vec<UiEffect>) {
        self.retry_visible = visible;
        effects.push(UiEffect::SetRetryVisible(visible));
    }

    fn push_message(&mut self, message: ChatMessage, effects: &mut Vec<UiEffect>) {
        self.transcript.push(message.clone());
        effects.push(UiEffect::RenderMessage(message));
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use shared::{
    domain::SessionId,
    error::{ApiError, ErrorCode},
    protocol::{AskRequest, AskResponse, LoadUrlRequest, LoadUrlResponse},
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{config::Settings, index::PageIndex, page::PageFetcher};

pub const NO_DOCUMENTS_DETAIL: &str =
    "No documents loaded — check page content or login requirement.";
pub const SESSION_NOT_FOUND_DETAIL: &str = "Session not found. Load a URL first.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

struct PageSession {
    index: Arc<PageIndex>,
    history: Vec<Exchange>,
    last_used: u64,
}

#[derive(Clone)]
pub struct ApiContext {
    pub fetcher: Arc<dyn PageFetcher>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub max_sessions: usize,
    sessions: Arc<RwLock<HashMap<SessionId, PageSession>>>,
    clock: Arc<AtomicU64>,
}

impl ApiContext {
    pub fn new(fetcher: Arc<dyn PageFetcher>, settings: &Settings) -> Self {
        Self {
            fetcher,
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            top_k: settings.top_k,
            max_sessions: settings.max_sessions.max(1),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock: Arc::new(AtomicU64::new(0)),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn history(&self, session_id: &SessionId) -> Option<Vec<Exchange>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|session| session.history.clone())
    }
}

/// Fetches and indexes the page, then (re)registers the session.
pub async fn load_url(ctx: &ApiContext, req: LoadUrlRequest) -> Result<LoadUrlResponse, ApiError> {
    info!(session_id = %req.session_id, url = %req.url, "load-url received");
    let document = ctx.fetcher.fetch(&req.url).await.map_err(|e| {
        warn!(session_id = %req.session_id, url = %req.url, error = %e, "page fetch failed");
        ApiError::new(ErrorCode::Upstream, format!("{e:#}"))
    })?;

    let index = PageIndex::build(&document, ctx.chunk_size, ctx.chunk_overlap)
        .ok_or_else(|| ApiError::new(ErrorCode::Internal, NO_DOCUMENTS_DETAIL))?;
    info!(
        session_id = %req.session_id,
        chunks = index.chunk_count(),
        title = index.title.as_deref().unwrap_or(""),
        "page indexed"
    );

    let mut sessions = ctx.sessions.write().await;
    sessions.insert(
        req.session_id,
        PageSession {
            index: Arc::new(index),
            history: Vec::new(),
            last_used: ctx.tick(),
        },
    );
    evict_least_recent(&mut sessions, ctx.max_sessions);

    Ok(LoadUrlResponse {
        message: "URL loaded and session initialized".to_string(),
    })
}

/// Answers against a snapshot of the session's index. The map lock is only
/// held to look the session up and to record the exchange.
pub async fn ask(ctx: &ApiContext, req: AskRequest) -> Result<AskResponse, ApiError> {
    let (index, previous) = {
        let sessions = ctx.sessions.read().await;
        let session = sessions
            .get(&req.session_id)
            .ok_or_else(|| ApiError::new(ErrorCode::NotFound, SESSION_NOT_FOUND_DETAIL))?;
        (
            Arc::clone(&session.index),
            session.history.last().map(|e| e.question.clone()),
        )
    };

    let answer = index.answer(&req.question, previous.as_deref(), ctx.top_k);

    let mut sessions = ctx.sessions.write().await;
    match sessions.get_mut(&req.session_id) {
        Some(session) if Arc::ptr_eq(&session.index, &index) => {
            session.history.push(Exchange {
                question: req.question,
                answer: answer.clone(),
            });
            session.last_used = ctx.tick();
            info!(
                session_id = %req.session_id,
                turns = session.history.len(),
                "question answered"
            );
        }
        _ => debug!(
            session_id = %req.session_id,
            "session reloaded or evicted while answering; exchange not recorded"
        ),
    }

    Ok(AskResponse { answer })
}

fn evict_least_recent(sessions: &mut HashMap<SessionId, PageSession>, max_sessions: usize) {
    while sessions.len() > max_sessions {
        let Some(oldest) = sessions
            .iter()
            .min_by_key(|(_, session)| session.last_used)
            .map(|(id, _)| id.clone())
        else {
            break;
        };
        sessions.remove(&oldest);
        info!(session_id = %oldest, "evicted idle session");
    }
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;

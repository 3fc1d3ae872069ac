//! Terminal host: active-page source, stdout renderer, and input commands.

use std::{
    io::{self, Write},
    sync::{Mutex, RwLock},
};

use async_trait::async_trait;
use client_core::{ActiveTabSource, ChatView};
use shared::domain::{ChatMessage, Role, SessionStatus};

/// The "active tab" is whatever URL the user last opened.
#[derive(Default)]
pub struct TerminalTab {
    url: RwLock<Option<String>>,
}

impl TerminalTab {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url: RwLock::new(url),
        }
    }

    pub fn open(&self, url: String) {
        if let Ok(mut guard) = self.url.write() {
            *guard = Some(url);
        }
    }
}

#[async_trait]
impl ActiveTabSource for TerminalTab {
    async fn active_tab_url(&self) -> Option<String> {
        self.url.read().ok().and_then(|guard| guard.clone())
    }
}

/// Line-oriented renderer. Writes to any sink so it can be exercised in tests.
pub struct TerminalView<W: Write + Send> {
    out: Mutex<W>,
    input_enabled: Mutex<bool>,
}

impl TerminalView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            input_enabled: Mutex::new(false),
        }
    }

    fn line(&self, text: &str) {
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{text}");
            let _ = out.flush();
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> ChatView for TerminalView<W> {
    fn render_message(&self, message: &ChatMessage) {
        let label = match message.role {
            Role::User => "you",
            Role::Bot => "tabby",
        };
        self.line(&format!("{label}> {}", message.text));
    }

    fn show_typing(&self) {
        self.line("Tabby is thinking...");
    }

    // Lines cannot be retracted; the answer that follows replaces the indicator.
    fn hide_typing(&self) {}

    fn set_status(&self, status: SessionStatus, label: &str) {
        let marker = match status {
            SessionStatus::Loading => "…",
            SessionStatus::Ready => "●",
            SessionStatus::Error => "✖",
        };
        self.line(&format!("[{marker} {label}]"));
    }

    fn set_retry_visible(&self, visible: bool) {
        if visible {
            self.line("Type /retry to try again, or /open <url> to switch pages.");
        }
    }

    fn set_input_enabled(&self, enabled: bool) {
        let was_enabled = match self.input_enabled.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, enabled),
            Err(_) => return,
        };
        if enabled && !was_enabled {
            self.line("Ask a question about this page (/quit to exit).");
        }
    }

    fn show_page(&self, host: &str) {
        self.line(&format!("📄 {host}"));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Ask(String),
    Retry,
    Open(String),
    Quit,
    Help,
    Unknown(String),
}

impl InputCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return InputCommand::Ask(line.to_string());
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name {
            "retry" => InputCommand::Retry,
            "quit" | "exit" => InputCommand::Quit,
            "help" => InputCommand::Help,
            "open" if !arg.is_empty() => InputCommand::Open(arg.to_string()),
            _ => InputCommand::Unknown(trimmed.to_string()),
        }
    }
}

pub const HELP: &str = "Commands: /open <url>  /retry  /help  /quit. Anything else is sent as a question.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_questions() {
        assert_eq!(
            InputCommand::parse("What is this?"),
            InputCommand::Ask("What is this?".to_string())
        );
        assert_eq!(InputCommand::parse("  /retry "), InputCommand::Retry);
        assert_eq!(InputCommand::parse("/exit"), InputCommand::Quit);
        assert_eq!(
            InputCommand::parse("/open   https://example.com "),
            InputCommand::Open("https://example.com".to_string())
        );
        assert_eq!(
            InputCommand::parse("/open"),
            InputCommand::Unknown("/open".to_string())
        );
        assert_eq!(InputCommand::parse(""), InputCommand::Ask(String::new()));
    }

    #[tokio::test]
    async fn tab_reports_latest_opened_url() {
        let tab = TerminalTab::new(None);
        assert_eq!(tab.active_tab_url().await, None);
        tab.open("https://example.com".to_string());
        assert_eq!(
            tab.active_tab_url().await.as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn view_renders_transcript_lines() {
        let view = TerminalView::new(Vec::new());
        view.set_status(SessionStatus::Ready, "Ready to chat!");
        view.set_input_enabled(true);
        view.render_message(&ChatMessage::user("hi"));
        view.show_typing();
        view.hide_typing();
        view.render_message(&ChatMessage::bot("hello"));
        view.set_retry_visible(true);

        let out = String::from_utf8(view.into_inner()).expect("utf8");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[● Ready to chat!]",
                "Ask a question about this page (/quit to exit).",
                "you> hi",
                "Tabby is thinking...",
                "tabby> hello",
                "Type /retry to try again, or /open <url> to switch pages.",
            ]
        );
    }
}

//! Page retrieval and HTML-to-text extraction.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::info;

use crate::config::Settings;

static HIDDEN_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?is)<script\b[^>]*>.*?</script\s*>",
        r"|<style\b[^>]*>.*?</style\s*>",
        r"|<noscript\b[^>]*>.*?</noscript\s*>",
        r"|<template\b[^>]*>.*?</template\s*>",
    ))
    .expect("hidden block pattern")
});
static COMMENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern"));
static BLOCK_BREAKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(p|div|br|li|h[1-6]|tr|section|article|header|footer|blockquote)\b[^>]*>")
        .expect("block pattern")
});
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"));
static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("title pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PageDocument>;
}

pub struct HttpPageFetcher {
    http: Client,
    user_agent: String,
}

impl HttpPageFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.fetch_timeout())
            .build()
            .context("failed to build page fetch client")?;
        Ok(Self {
            http,
            user_agent: settings.user_agent.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<PageDocument> {
        info!(%url, "fetching page");
        let response = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .with_context(|| format!("failed to fetch {url}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("fetching {url} returned {status}"));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_ascii_lowercase();
        let body = response.text().await?;

        if content_type.contains("html") {
            Ok(extract_document(url, &body))
        } else {
            Ok(PageDocument {
                url: url.to_string(),
                title: None,
                text: collapse_whitespace(&body),
            })
        }
    }
}

pub fn extract_document(url: &str, html: &str) -> PageDocument {
    let title = TITLE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| collapse_whitespace(&decode_entities(m.as_str())))
        .filter(|t| !t.is_empty());

    let without_hidden = HIDDEN_BLOCKS.replace_all(html, " ");
    let without_comments = COMMENTS.replace_all(&without_hidden, " ");
    let with_breaks = BLOCK_BREAKS.replace_all(&without_comments, "\n");
    let stripped = TAGS.replace_all(&with_breaks, " ");
    let text = decode_entities(&stripped)
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    PageDocument {
        url: url.to_string(),
        title,
        text,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

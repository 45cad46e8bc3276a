//! In-memory log of recent analyses

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::spam::ClassificationResult;

/// Characters of analyzed text kept per entry
const PREVIEW_CHARS: usize = 100;

/// One analyzed request
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// `text` or `ocr`
    pub source: String,
    pub text_preview: String,
    pub is_spam: bool,
    pub confidence: f64,
    pub keywords: Vec<String>,
}

impl HistoryEntry {
    pub fn new(source: &str, result: &ClassificationResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.to_string(),
            text_preview: result.normalized_text.chars().take(PREVIEW_CHARS).collect(),
            is_spam: result.is_spam,
            confidence: result.spam_probability,
            keywords: result.keywords.clone(),
        }
    }
}

/// Bounded ring of recent entries, oldest evicted first
pub struct History {
    entries: RwLock<VecDeque<HistoryEntry>>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub async fn record(&self, entry: HistoryEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.write().await;
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Most recent first
    pub async fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let entries = self.entries.read().await;
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

//! Deterministic stand-ins for the hosted embedding and chat services used by unit tests.

use crate::azure::AzureError;
use crate::chat::{ChatClientError, ChatModel, ChatPrompt, ChatTurn};
use crate::embedding::{Embedder, EmbeddingClientError};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const VOCABULARY: &[&str] = &[
    "revenue", "headcount", "merger", "office", "harbour", "north", "alpha", "beta", "gamma",
    "delta", "omega",
];

/// Bag-of-keywords embedder: one dimension per vocabulary word plus a small bias dimension so
/// no vector is ever zero.
#[derive(Default)]
pub(crate) struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub(crate) fn encode(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let mut vector: Vec<f32> = VOCABULARY
            .iter()
            .map(|word| lowered.matches(word).count() as f32)
            .collect();
        vector.push(0.01);
        vector
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }
}

struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        Err(EmbeddingClientError::GenerationFailed(
            "simulated outage".into(),
        ))
    }
}

pub(crate) fn failing_embedder() -> Arc<dyn Embedder> {
    Arc::new(FailingEmbedder)
}

/// Chat model that replays scripted answers and records every request.
pub(crate) struct ScriptedChat {
    answers: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<(ChatPrompt, Vec<ChatTurn>)>>,
}

impl ScriptedChat {
    pub(crate) fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<(ChatPrompt, Vec<ChatTurn>)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(
        &self,
        prompt: &ChatPrompt,
        history: &[ChatTurn],
    ) -> Result<String, ChatClientError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((prompt.clone(), history.to_vec()));
        self.answers
            .lock()
            .expect("answers lock")
            .pop_front()
            .ok_or_else(|| ChatClientError::InvalidResponse("script exhausted".into()))
    }
}

struct FailingChat;

#[async_trait]
impl ChatModel for FailingChat {
    async fn complete(
        &self,
        _prompt: &ChatPrompt,
        _history: &[ChatTurn],
    ) -> Result<String, ChatClientError> {
        Err(ChatClientError::Azure(AzureError::UnexpectedStatus {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "simulated outage".into(),
        }))
    }
}

pub(crate) fn failing_chat() -> Arc<dyn ChatModel> {
    Arc::new(FailingChat)
}

/// Minimal valid PDF with one Helvetica text line per page, in page order.
pub(crate) fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let page_ids: Vec<usize> = (0..pages.len()).map(|n| 4 + 2 * n).collect();
    let kids = page_ids
        .iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];
    for (text, page_id) in pages.iter().zip(&page_ids) {
        let content = format!("BT /F1 24 Tf 72 720 Td ({text}) Tj ET");
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            page_id + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ));
    }

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (number, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", number + 1).as_bytes());
    }

    let xref_offset = pdf.len();
    let mut trailer = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        trailer.push_str(&format!("{offset:010} 00000 n \n"));
    }
    trailer.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.extend_from_slice(trailer.as_bytes());
    pdf
}

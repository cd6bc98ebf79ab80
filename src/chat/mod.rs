//! Chatbot answers: the KB rows closest to a free-form question.


use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::context::AppContext;
use crate::detection::LogoDetection;
use crate::knowledge::{KnowledgeBaseError, SemanticMatchResult};
use crate::ocr::TextExtractor;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Search(#[from] KnowledgeBaseError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// The question echoed back with its ranked KB matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub query: String,
    pub results: Vec<SemanticMatchResult>,
}

/// Ranks KB rows against `question` (at most `top_k_chat_results` of them).
///
/// A question that normalizes to nothing yields no results.
#[instrument(skip_all, fields(question_len = question.len()))]
pub async fn answer_question<D, O>(
    ctx: &AppContext<D, O>,
    question: &str,
) -> Result<ChatResponse, ChatError>
where
    D: LogoDetection + 'static,
    O: TextExtractor + 'static,
{
    let knowledge = Arc::clone(ctx.knowledge());
    let top_k = ctx.settings().top_k_chat_results;
    let query = question.to_string();

    let results = tokio::task::spawn_blocking(move || knowledge.search(&query, top_k)).await??;
    debug!(results = results.len(), "Chat search complete");

    Ok(ChatResponse {
        query: question.to_string(),
        results,
    })
}

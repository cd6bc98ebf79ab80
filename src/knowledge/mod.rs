//! Semantic matching against the halal knowledge base.
//!
//! The KB is a fixed table of reference phrases paired by index with precomputed
//! embeddings. Queries are normalized with [`crate::text::normalize`], embedded with the
//! same sentence model, and scored by cosine similarity against every row.
//!
//! - [`KnowledgeBase::classify`] picks the single best row for an ingredient list and
//!   downgrades weak matches to [`HalalStatus::Doubtful`].
//! - [`KnowledgeBase::search`] ranks rows for a free-form question (chatbot).

mod error;
/// KB file readers and writers.
pub mod loader;
mod types;


pub use error::KnowledgeBaseError;
pub use types::{HalalStatus, KbEntry, SemanticMatchResult};

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::constants::validate_embedding_dim;
use crate::embedding::SentenceEmbedder;
use crate::text::normalize;

/// Applies the similarity threshold to a row's stored status.
///
/// Scores strictly below `threshold` yield [`HalalStatus::Doubtful`]; otherwise the stored
/// status is kept.
pub fn resolve_status(score: f32, threshold: f32, base: HalalStatus) -> HalalStatus {
    if score < threshold {
        HalalStatus::Doubtful
    } else {
        base
    }
}

/// Cosine similarity of two `f32` vectors (0.0 for empty, mismatched or zero vectors).
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a_sq, norm_b_sq) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (&av, &bv)| {
            (dot + av * bv, na + av * av, nb + bv * bv)
        });

    let norm_a = norm_a_sq.sqrt();
    let norm_b = norm_b_sq.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Read-only KB plus the embedder used to encode queries.
pub struct KnowledgeBase {
    entries: Vec<KbEntry>,
    embeddings: Vec<Vec<f32>>,
    embedder: SentenceEmbedder,
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("rows", &self.entries.len())
            .field("embedding_dim", &self.embedding_dim())
            .field("embedder", &self.embedder)
            .finish()
    }
}

impl KnowledgeBase {
    /// Loads the table and embedding files and checks them against `embedder`.
    #[instrument(
        skip_all,
        fields(table = %table_path.display(), embeddings = %embeddings_path.display())
    )]
    pub fn load(
        table_path: &Path,
        embeddings_path: &Path,
        embedder: SentenceEmbedder,
    ) -> Result<Self, KnowledgeBaseError> {
        let entries = loader::load_table(table_path)?;
        let embeddings = loader::load_embeddings(embeddings_path)?;
        let kb = Self::from_parts(entries, embeddings, embedder)?;

        info!(
            rows = kb.len(),
            embedding_dim = kb.embedding_dim(),
            stub_embedder = kb.embedder.is_stub(),
            "Knowledge base loaded"
        );
        Ok(kb)
    }

    /// Builds a KB from rows and their embeddings (matched by index).
    pub fn from_parts(
        entries: Vec<KbEntry>,
        embeddings: Vec<Vec<f32>>,
        embedder: SentenceEmbedder,
    ) -> Result<Self, KnowledgeBaseError> {
        if entries.is_empty() || embeddings.is_empty() {
            return Err(KnowledgeBaseError::Empty);
        }

        if entries.len() != embeddings.len() {
            return Err(KnowledgeBaseError::LengthMismatch {
                rows: entries.len(),
                embeddings: embeddings.len(),
            });
        }

        let width = embeddings[0].len();
        if let Some((row, bad)) = embeddings
            .iter()
            .enumerate()
            .find(|(_, emb)| emb.len() != width)
        {
            return Err(KnowledgeBaseError::InconsistentWidth {
                row,
                expected: width,
                actual: bad.len(),
            });
        }

        validate_embedding_dim(width, embedder.embedding_dim())?;

        Ok(Self {
            entries,
            embeddings,
            embedder,
        })
    }

    /// Builds a KB by embedding each entry's `norm_text` in-process.
    pub fn from_entries(
        entries: Vec<KbEntry>,
        embedder: SentenceEmbedder,
    ) -> Result<Self, KnowledgeBaseError> {
        let embeddings = entries
            .iter()
            .map(|entry| embedder.embed(&entry.norm_text))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_parts(entries, embeddings, embedder)
    }

    /// Writes the table and embeddings in the format [`KnowledgeBase::load`] reads.
    pub fn save(
        &self,
        table_path: &Path,
        embeddings_path: &Path,
    ) -> Result<(), KnowledgeBaseError> {
        loader::save_table(table_path, &self.entries)?;
        loader::save_embeddings(embeddings_path, &self.embeddings)
    }

    /// Returns the best-matching row for an ingredient list.
    ///
    /// Empty tokens are dropped and the rest joined with spaces before normalization. On ties
    /// the earliest row wins. A best score below `threshold` reports
    /// [`HalalStatus::Doubtful`].
    #[instrument(skip(self, ingredients), fields(ingredient_count = ingredients.len()))]
    pub fn classify<S: AsRef<str>>(
        &self,
        ingredients: &[S],
        threshold: f32,
    ) -> Result<SemanticMatchResult, KnowledgeBaseError> {
        let tokens: Vec<&str> = ingredients
            .iter()
            .map(AsRef::as_ref)
            .filter(|token| !token.is_empty())
            .collect();
        if tokens.is_empty() {
            return Err(KnowledgeBaseError::EmptyIngredients);
        }

        let query = normalize(&tokens.join(" "));
        if query.is_empty() {
            return Err(KnowledgeBaseError::UnmatchableIngredients);
        }

        let scores = self.score_all(&query)?;

        let mut best_index = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (index, &score) in scores.iter().enumerate() {
            if score > best_score {
                best_score = score;
                best_index = index;
            }
        }

        let entry = &self.entries[best_index];
        let status = resolve_status(best_score, threshold, entry.status);

        debug!(
            best_index,
            best_score,
            threshold,
            stored_status = %entry.status,
            %status,
            "Classified ingredient list"
        );

        Ok(SemanticMatchResult {
            score: best_score,
            status,
            matched_text: entry.original_text.clone(),
        })
    }

    /// Returns up to `top_k` rows ranked by descending similarity (ties keep row order).
    ///
    /// A query that normalizes to nothing yields an empty list.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SemanticMatchResult>, KnowledgeBaseError> {
        let normalized = normalize(query);
        if normalized.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let scores = self.score_all(&normalized)?;

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(top_k);

        debug!(
            returned = ranked.len(),
            top_score = ranked.first().map(|(_, s)| *s),
            "KB search complete"
        );

        Ok(ranked
            .into_iter()
            .map(|(index, score)| {
                let entry = &self.entries[index];
                SemanticMatchResult {
                    score,
                    status: entry.status,
                    matched_text: entry.original_text.clone(),
                }
            })
            .collect())
    }

    fn score_all(&self, normalized_query: &str) -> Result<Vec<f32>, KnowledgeBaseError> {
        let query = self.embedder.embed(normalized_query)?;
        Ok(self
            .embeddings
            .iter()
            .map(|row| cosine_similarity(&query, row))
            .collect())
    }

    /// Number of KB rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false` for a constructed KB.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[KbEntry] {
        &self.entries
    }

    pub fn embedding_dim(&self) -> usize {
        self.embeddings.first().map(Vec::len).unwrap_or(0)
    }

    /// The embedder used to encode queries.
    pub fn embedder(&self) -> &SentenceEmbedder {
        &self.embedder
    }
}

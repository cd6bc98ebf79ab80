use serde::{Deserialize, Serialize};

/// Halal verdict attached to KB entries and analysis results.
///
/// Serialized lowercase. Parsing is case-insensitive and never fails: anything unrecognised,
/// including a `null` status, becomes [`HalalStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum HalalStatus {
    /// Permissible.
    Halal,
    /// Forbidden.
    Haram,
    /// Uncertain, or the KB match was too weak to trust.
    Doubtful,
    /// The KB row carries no usable status.
    #[default]
    Unknown,
}

impl HalalStatus {
    /// Returns the lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HalalStatus::Halal => "halal",
            HalalStatus::Haram => "haram",
            HalalStatus::Doubtful => "doubtful",
            HalalStatus::Unknown => "unknown",
        }
    }

    /// Parses a status string (case-insensitive, surrounding whitespace ignored).
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "halal" => HalalStatus::Halal,
            "haram" => HalalStatus::Haram,
            "doubtful" => HalalStatus::Doubtful,
            _ => HalalStatus::Unknown,
        }
    }
}

impl From<String> for HalalStatus {
    fn from(value: String) -> Self {
        HalalStatus::parse(&value)
    }
}

impl From<Option<String>> for HalalStatus {
    fn from(value: Option<String>) -> Self {
        value.map(HalalStatus::from).unwrap_or_default()
    }
}

impl From<&str> for HalalStatus {
    fn from(value: &str) -> Self {
        HalalStatus::parse(value)
    }
}

impl std::fmt::Display for HalalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the KB table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbEntry {
    /// Normalized phrase the stored embedding was computed from.
    pub norm_text: String,
    /// Human-readable phrase returned as `matched_text`.
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub status: HalalStatus,
}

impl KbEntry {
    pub fn new(
        norm_text: impl Into<String>,
        original_text: impl Into<String>,
        status: HalalStatus,
    ) -> Self {
        Self {
            norm_text: norm_text.into(),
            original_text: original_text.into(),
            status,
        }
    }
}

/// Similarity of a query against one KB entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticMatchResult {
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
    pub status: HalalStatus,
    /// The entry's `original_text`.
    pub matched_text: String,
}

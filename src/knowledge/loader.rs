//! KB files: a JSON table and a safetensors embedding matrix.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use tracing::debug;

use super::error::KnowledgeBaseError;
use super::types::KbEntry;

/// Tensor name looked up in the embeddings file.
pub const EMBEDDINGS_TENSOR_NAME: &str = "embeddings";

/// Reads the KB table (a JSON array of entries).
pub fn load_table(path: &Path) -> Result<Vec<KbEntry>, KnowledgeBaseError> {
    let content = std::fs::read_to_string(path).map_err(|source| KnowledgeBaseError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let entries: Vec<KbEntry> =
        serde_json::from_str(&content).map_err(|e| KnowledgeBaseError::InvalidTable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    debug!(path = %path.display(), rows = entries.len(), "Loaded KB table");
    Ok(entries)
}

/// Reads the `[rows, dim]` embedding matrix, converting half-precision storage to `f32`.
///
/// The tensor is taken from [`EMBEDDINGS_TENSOR_NAME`], or from the only tensor in the file.
pub fn load_embeddings(path: &Path) -> Result<Vec<Vec<f32>>, KnowledgeBaseError> {
    let invalid = |reason: String| KnowledgeBaseError::InvalidEmbeddings {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = std::fs::read(path).map_err(|source| KnowledgeBaseError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tensors = candle_core::safetensors::load_buffer(&bytes, &Device::Cpu)
        .map_err(|e| invalid(e.to_string()))?;

    let tensor = match tensors.remove(EMBEDDINGS_TENSOR_NAME) {
        Some(tensor) => tensor,
        None if tensors.len() == 1 => tensors
            .into_values()
            .next()
            .ok_or_else(|| invalid("no tensors found".to_string()))?,
        None => {
            return Err(invalid(format!(
                "expected a tensor named '{}' or exactly one tensor, found {}",
                EMBEDDINGS_TENSOR_NAME,
                tensors.len()
            )));
        }
    };

    if tensor.rank() != 2 {
        return Err(invalid(format!(
            "expected a rank-2 tensor, got shape {:?}",
            tensor.dims()
        )));
    }

    let rows = tensor
        .to_dtype(DType::F32)
        .and_then(|t| t.to_vec2::<f32>())
        .map_err(|e| invalid(e.to_string()))?;

    debug!(
        path = %path.display(),
        rows = rows.len(),
        dim = rows.first().map(Vec::len).unwrap_or(0),
        "Loaded KB embeddings"
    );
    Ok(rows)
}

/// Writes the KB table as pretty-printed JSON.
pub fn save_table(path: &Path, entries: &[KbEntry]) -> Result<(), KnowledgeBaseError> {
    let json =
        serde_json::to_string_pretty(entries).map_err(|e| KnowledgeBaseError::InvalidTable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    std::fs::write(path, json).map_err(|source| KnowledgeBaseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a `[rows, dim]` F32 matrix under [`EMBEDDINGS_TENSOR_NAME`].
pub fn save_embeddings(path: &Path, rows: &[Vec<f32>]) -> Result<(), KnowledgeBaseError> {
    let invalid = |reason: String| KnowledgeBaseError::InvalidEmbeddings {
        path: path.to_path_buf(),
        reason,
    };

    let dim = rows.first().map(Vec::len).unwrap_or(0);
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    let tensor = Tensor::from_vec(flat, (rows.len(), dim), &Device::Cpu)
        .map_err(|e| invalid(e.to_string()))?;

    let tensors = HashMap::from([(EMBEDDINGS_TENSOR_NAME.to_string(), tensor)]);
    candle_core::safetensors::save(&tensors, path).map_err(|e| invalid(e.to_string()))
}

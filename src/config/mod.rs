//! Environment-backed settings.
//!
//! Every setting has a default. Override with `HALAL_*` environment variables, optionally
//! supplied through a `.env` file ([`Settings::from_env_file`]); variables already set in the
//! process win over the file. The OCR credential may also come from a local key file (see
//! [`Settings::ENV_API_KEY_FILE`]). Path settings expand a leading `~` to `$HOME`.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_OCR_BASE_URL, DEFAULT_OCR_MODEL,
    DEFAULT_SEMANTIC_THRESHOLD, DEFAULT_TOP_K_CHAT_RESULTS,
};
use crate::detection::ModelSize;

/// Process-wide settings, loaded once at startup.
///
/// Use [`Settings::from_env`] to read `HALAL_*` overrides on top of defaults.
#[derive(Clone)]
pub struct Settings {
    /// HTTP server port. Default: `8000`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Credential for the OCR service. Empty when none is configured.
    pub gemini_api_key: String,

    /// Vision model used for OCR.
    pub ocr_model: String,

    /// Base URL of the OCR service.
    pub ocr_base_url: String,

    /// JSON table of KB entries.
    pub kb_table_path: PathBuf,

    /// Safetensors file with one embedding row per KB entry.
    pub kb_embeddings_path: PathBuf,

    /// Sentence model directory (`config.json`, `model.safetensors`, `tokenizer.json`).
    /// `None` runs the embedder in stub mode.
    pub embedding_model_path: Option<PathBuf>,

    /// Logo detector weights (safetensors).
    pub logo_weights_path: PathBuf,

    /// YOLOv8 variant the weights were trained with.
    pub logo_model_size: ModelSize,

    /// Number of classes in the detector head.
    pub logo_num_classes: usize,

    /// Memory-map the detector weights instead of reading them into memory.
    pub trust_logo_weights: bool,

    /// Minimum cosine similarity for a KB match to keep its stored status.
    pub semantic_threshold: f32,

    /// Number of KB entries returned for chatbot questions.
    pub top_k_chat_results: usize,

    /// Largest accepted request body on `/api/analyze`.
    pub max_upload_bytes: usize,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("port", &self.port)
            .field("bind_addr", &self.bind_addr)
            .field(
                "gemini_api_key",
                &if self.gemini_api_key.is_empty() {
                    "<unset>"
                } else {
                    "<redacted>"
                },
            )
            .field("ocr_model", &self.ocr_model)
            .field("ocr_base_url", &self.ocr_base_url)
            .field("kb_table_path", &self.kb_table_path)
            .field("kb_embeddings_path", &self.kb_embeddings_path)
            .field("embedding_model_path", &self.embedding_model_path)
            .field("logo_weights_path", &self.logo_weights_path)
            .field("logo_model_size", &self.logo_model_size)
            .field("logo_num_classes", &self.logo_num_classes)
            .field("trust_logo_weights", &self.trust_logo_weights)
            .field("semantic_threshold", &self.semantic_threshold)
            .field("top_k_chat_results", &self.top_k_chat_results)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

/// Env file read by the server at startup.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Default key file consulted when `HALAL_GEMINI_API_KEY` is not set.
pub const DEFAULT_API_KEY_FILE: &str = "./apikey.txt";

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            gemini_api_key: String::new(),
            ocr_model: DEFAULT_OCR_MODEL.to_string(),
            ocr_base_url: DEFAULT_OCR_BASE_URL.to_string(),
            kb_table_path: PathBuf::from("./HalalKB/kb_table.json"),
            kb_embeddings_path: PathBuf::from("./HalalKB/kb_embeddings.safetensors"),
            embedding_model_path: None,
            logo_weights_path: PathBuf::from("./HalalLogoDetector/best.safetensors"),
            logo_model_size: ModelSize::N,
            logo_num_classes: 1,
            trust_logo_weights: false,
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            top_k_chat_results: DEFAULT_TOP_K_CHAT_RESULTS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Settings {
    /// Env var holding the listen port.
    pub const ENV_PORT: &'static str = "HALAL_PORT";
    const ENV_BIND_ADDR: &'static str = "HALAL_BIND_ADDR";
    const ENV_GEMINI_API_KEY: &'static str = "HALAL_GEMINI_API_KEY";
    /// Env var naming the local key file.
    pub const ENV_API_KEY_FILE: &'static str = "HALAL_API_KEY_FILE";
    const ENV_OCR_MODEL: &'static str = "HALAL_OCR_MODEL";
    const ENV_OCR_BASE_URL: &'static str = "HALAL_OCR_BASE_URL";
    const ENV_KB_TABLE_PATH: &'static str = "HALAL_KB_TABLE_PATH";
    const ENV_KB_EMBEDDINGS_PATH: &'static str = "HALAL_KB_EMBEDDINGS_PATH";
    const ENV_EMBEDDING_MODEL_PATH: &'static str = "HALAL_EMBEDDING_MODEL_PATH";
    const ENV_LOGO_WEIGHTS_PATH: &'static str = "HALAL_LOGO_WEIGHTS_PATH";
    const ENV_LOGO_MODEL_SIZE: &'static str = "HALAL_LOGO_MODEL_SIZE";
    const ENV_LOGO_NUM_CLASSES: &'static str = "HALAL_LOGO_NUM_CLASSES";
    const ENV_TRUST_LOGO_WEIGHTS: &'static str = "HALAL_TRUST_LOGO_WEIGHTS";
    const ENV_SEMANTIC_THRESHOLD: &'static str = "HALAL_SEMANTIC_THRESHOLD";
    const ENV_TOP_K_CHAT_RESULTS: &'static str = "HALAL_TOP_K_CHAT_RESULTS";
    const ENV_MAX_UPLOAD_BYTES: &'static str = "HALAL_MAX_UPLOAD_BYTES";

    /// Loads `path` into the process environment, then calls [`Settings::from_env`].
    ///
    /// A missing file is skipped. Variables already present in the environment are not
    /// overwritten by the file.
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile {
                path: path.to_path_buf(),
                source,
            })?;
        }
        Self::from_env()
    }

    /// Loads settings from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;

        let key_file = Self::parse_path_from_env(
            Self::ENV_API_KEY_FILE,
            PathBuf::from(DEFAULT_API_KEY_FILE),
        );
        let gemini_api_key = Self::parse_optional_string_from_env(Self::ENV_GEMINI_API_KEY)
            .or_else(|| read_api_key_file(&key_file))
            .unwrap_or_default();

        let ocr_model = Self::parse_string_from_env(Self::ENV_OCR_MODEL, defaults.ocr_model);
        let ocr_base_url =
            Self::parse_string_from_env(Self::ENV_OCR_BASE_URL, defaults.ocr_base_url);
        let kb_table_path =
            Self::parse_path_from_env(Self::ENV_KB_TABLE_PATH, defaults.kb_table_path);
        let kb_embeddings_path =
            Self::parse_path_from_env(Self::ENV_KB_EMBEDDINGS_PATH, defaults.kb_embeddings_path);
        let embedding_model_path =
            Self::parse_optional_path_from_env(Self::ENV_EMBEDDING_MODEL_PATH);
        let logo_weights_path =
            Self::parse_path_from_env(Self::ENV_LOGO_WEIGHTS_PATH, defaults.logo_weights_path);

        let logo_model_size = match Self::parse_optional_string_from_env(Self::ENV_LOGO_MODEL_SIZE)
        {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidModelSize { value })?,
            None => defaults.logo_model_size,
        };

        let logo_num_classes =
            Self::parse_number_from_env(Self::ENV_LOGO_NUM_CLASSES, defaults.logo_num_classes)?;
        let trust_logo_weights =
            Self::parse_bool_from_env(Self::ENV_TRUST_LOGO_WEIGHTS, defaults.trust_logo_weights)?;
        let semantic_threshold =
            Self::parse_number_from_env(Self::ENV_SEMANTIC_THRESHOLD, defaults.semantic_threshold)?;
        let top_k_chat_results =
            Self::parse_number_from_env(Self::ENV_TOP_K_CHAT_RESULTS, defaults.top_k_chat_results)?;
        let max_upload_bytes =
            Self::parse_number_from_env(Self::ENV_MAX_UPLOAD_BYTES, defaults.max_upload_bytes)?;

        Ok(Self {
            port,
            bind_addr,
            gemini_api_key,
            ocr_model,
            ocr_base_url,
            kb_table_path,
            kb_embeddings_path,
            embedding_model_path,
            logo_weights_path,
            logo_model_size,
            logo_num_classes,
            trust_logo_weights,
            semantic_threshold,
            top_k_chat_results,
            max_upload_bytes,
        })
    }

    /// Validates ranges and required paths (the detector weights are optional).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.semantic_threshold) {
            return Err(ConfigError::ThresholdOutOfRange {
                name: Self::ENV_SEMANTIC_THRESHOLD,
                value: self.semantic_threshold,
            });
        }

        if self.top_k_chat_results == 0 {
            return Err(ConfigError::ZeroCount {
                name: Self::ENV_TOP_K_CHAT_RESULTS,
            });
        }

        if self.logo_num_classes == 0 {
            return Err(ConfigError::ZeroCount {
                name: Self::ENV_LOGO_NUM_CLASSES,
            });
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::ZeroCount {
                name: Self::ENV_MAX_UPLOAD_BYTES,
            });
        }

        Self::require_file(&self.kb_table_path)?;
        Self::require_file(&self.kb_embeddings_path)?;

        if let Some(ref path) = self.embedding_model_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }

        if self.logo_weights_path.exists() && !self.logo_weights_path.is_file() {
            return Err(ConfigError::NotAFile {
                path: self.logo_weights_path.clone(),
            });
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Returns `true` when an OCR credential is available.
    pub fn has_api_key(&self) -> bool {
        !self.gemini_api_key.trim().is_empty()
    }

    fn require_file(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            return Err(ConfigError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(ConfigError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        Self::parse_optional_path_from_env(var_name).unwrap_or(default)
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        Self::parse_optional_string_from_env(var_name).map(|value| expand_home(&value))
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        Self::parse_optional_string_from_env(var_name).unwrap_or(default)
    }

    fn parse_number_from_env<T: std::str::FromStr>(
        var_name: &'static str,
        default: T,
    ) -> Result<T, ConfigError> {
        match Self::parse_optional_string_from_env(var_name) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: var_name,
                value,
            }),
            None => Ok(default),
        }
    }

    fn parse_bool_from_env(var_name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match Self::parse_optional_string_from_env(var_name) {
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    name: var_name,
                    value,
                }),
            },
            None => Ok(default),
        }
    }
}

/// Expands a leading `~` (alone or followed by `/`) to `$HOME`. Other paths are unchanged.
pub fn expand_home(value: &str) -> PathBuf {
    let rest = match value.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return PathBuf::from(value),
    };

    match env::var_os("HOME").filter(|home| !home.is_empty()) {
        Some(home) => PathBuf::from(home).join(rest.trim_start_matches('/')),
        None => PathBuf::from(value),
    }
}

/// Reads the OCR credential from a local key file.
///
/// Accepts either a bare key on the first non-comment line, or an assignment such as
/// `GEMINI_API_KEY = "..."`. Returns `None` when the file is missing or holds no key.
pub fn read_api_key_file(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;

    let mut bare: Option<String> = None;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((name, value)) = line.split_once('=') {
            if name.trim() == "GEMINI_API_KEY" {
                let value = value.trim().trim_matches(|c| c == '"' || c == '\'').trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        } else if bare.is_none() {
            bare = Some(line.to_string());
        }
    }

    bare
}

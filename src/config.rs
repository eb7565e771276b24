//! Process-wide settings for resume conversion.
//!
//! [`Settings`] is built once per process, from the environment by the
//! binaries or through [`SettingsBuilder`] by library callers and tests, and
//! then shared with every pipeline call. Nothing re-reads the environment
//! per request.
//!
//! The binaries load a `.env` file with `dotenvy` before calling
//! [`Settings::from_env`], so the variables below may live in either place.

use crate::error::Cv2DocError;
use std::fmt;
use std::path::PathBuf;

// ── Environment variable names ───────────────────────────────────────────

pub const ENV_API_KEY: &str = "AI_API_KEY";
pub const ENV_PROMPT_PATH: &str = "PROMPT_PATH";
pub const ENV_JSON_OUTPUT_DIR: &str = "JSON_OUTPUT_DIR";
pub const ENV_RESULTS_DIR: &str = "RESULTS_DIR";
pub const ENV_TEMPLATE_PATH: &str = "DOX_TEMPLATE_PATH";
pub const ENV_MODEL: &str = "AI_MODEL";
pub const ENV_BASE_URL: &str = "AI_BASE_URL";
pub const ENV_REQUEST_TIMEOUT: &str = "AI_REQUEST_TIMEOUT_SECS";
pub const ENV_PDFIUM_LIB_PATH: &str = "PDFIUM_LIB_PATH";

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Provider credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for the request header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Configuration for one process: credentials, file locations, provider knobs.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Provider API credential.
    pub api_key: ApiKey,

    /// Prompt template file; `{date}` is replaced with today's date.
    pub prompt_path: PathBuf,

    /// Directory receiving `{stem}.json` records.
    pub json_output_dir: PathBuf,

    /// Directory receiving `{stem}.docx` documents.
    pub results_dir: PathBuf,

    /// The `.docx` template filled from each record.
    pub template_path: PathBuf,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Base URL of the generateContent API. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Upper bound on a single provider call, in seconds. Default: 120.
    ///
    /// A hung provider call would otherwise block its request forever.
    pub request_timeout_secs: u64,

    /// Explicit pdfium library (file or directory). `None` loads the system library.
    pub pdfium_library_path: Option<PathBuf>,
}

impl Settings {
    /// Create a new builder for `Settings`.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, Cv2DocError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// Empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Cv2DocError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut builder = Settings::builder();
        if let Some(v) = get(ENV_API_KEY) {
            builder = builder.api_key(v);
        }
        if let Some(v) = get(ENV_PROMPT_PATH) {
            builder = builder.prompt_path(v);
        }
        if let Some(v) = get(ENV_JSON_OUTPUT_DIR) {
            builder = builder.json_output_dir(v);
        }
        if let Some(v) = get(ENV_RESULTS_DIR) {
            builder = builder.results_dir(v);
        }
        if let Some(v) = get(ENV_TEMPLATE_PATH) {
            builder = builder.template_path(v);
        }
        if let Some(v) = get(ENV_MODEL) {
            builder = builder.model(v);
        }
        if let Some(v) = get(ENV_BASE_URL) {
            builder = builder.base_url(v);
        }
        if let Some(v) = get(ENV_REQUEST_TIMEOUT) {
            let secs = v
                .trim()
                .parse::<u64>()
                .map_err(|e| Cv2DocError::InvalidSetting {
                    name: ENV_REQUEST_TIMEOUT,
                    detail: format!("'{v}': {e}"),
                })?;
            builder = builder.request_timeout_secs(secs);
        }
        if let Some(v) = get(ENV_PDFIUM_LIB_PATH) {
            builder = builder.pdfium_library_path(v);
        }

        builder.build()
    }
}

/// Builder for [`Settings`].
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    api_key: Option<ApiKey>,
    prompt_path: Option<PathBuf>,
    json_output_dir: Option<PathBuf>,
    results_dir: Option<PathBuf>,
    template_path: Option<PathBuf>,
    model: Option<String>,
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    pdfium_library_path: Option<PathBuf>,
}

impl SettingsBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(ApiKey::new(key));
        self
    }

    pub fn prompt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.prompt_path = Some(path.into());
        self
    }

    pub fn json_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.json_output_dir = Some(dir.into());
        self
    }

    pub fn results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(dir.into());
        self
    }

    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs.max(1));
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.pdfium_library_path = Some(path.into());
        self
    }

    /// Build the settings, failing on the first missing required value.
    pub fn build(self) -> Result<Settings, Cv2DocError> {
        Ok(Settings {
            api_key: self.api_key.ok_or(Cv2DocError::MissingSetting { name: ENV_API_KEY })?,
            prompt_path: self.prompt_path.ok_or(Cv2DocError::MissingSetting {
                name: ENV_PROMPT_PATH,
            })?,
            json_output_dir: self.json_output_dir.ok_or(Cv2DocError::MissingSetting {
                name: ENV_JSON_OUTPUT_DIR,
            })?,
            results_dir: self.results_dir.ok_or(Cv2DocError::MissingSetting {
                name: ENV_RESULTS_DIR,
            })?,
            template_path: self.template_path.ok_or(Cv2DocError::MissingSetting {
                name: ENV_TEMPLATE_PATH,
            })?,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: self
                .base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            pdfium_library_path: self.pdfium_library_path,
        })
    }
}

//! Configuration types for document synthesis.
//!
//! All pipeline behaviour is controlled through [`SynthesisConfig`], built
//! via its [`SynthesisConfigBuilder`]. User-facing choices that change from
//! one click to the next (language, task mode, API key) live separately in
//! [`Preferences`], owned by the session.

use crate::error::NexusPathError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Models tried in order when the catalog is discovered at call time.
pub const DEFAULT_MODEL_PRIORITY: [&str; 3] = ["gemini-1.5-flash", "gemini-1.5-pro", "gemini-pro"];

/// Default Generative Language API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Heading written at the top of exported documents.
pub const DEFAULT_DOCUMENT_TITLE: &str = "Life Action Plan";

/// Accepted PDF export font sizes, in points.
pub const PDF_FONT_SIZE_RANGE: RangeInclusive<f32> = 4.0..=72.0;

/// Configuration for the extraction → prompt → synthesis → export pipeline.
///
/// # Example
/// ```rust
/// use nexuspath::{ModelPolicy, SynthesisConfig};
///
/// let config = SynthesisConfig::builder()
///     .char_budget(30_000)
///     .model_policy(ModelPolicy::Static("gemini-1.5-pro".into()))
///     .build()
///     .unwrap();
/// assert_eq!(config.char_budget, 30_000);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Maximum number of characters of extracted text sent to the model. Default: 15 000.
    ///
    /// The input is cut to its leading `char_budget` characters. The right
    /// value depends on the backend's context window; it is a knob, not a
    /// derived quantity.
    pub char_budget: usize,

    /// How the model identifier is chosen for each synthesis call.
    pub model_policy: ModelPolicy,

    /// Sampling temperature. Default: 0.7.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 8192.
    pub max_output_tokens: usize,

    /// Per-request HTTP timeout in seconds. Default: none (client default).
    pub request_timeout_secs: Option<u64>,

    /// Base URL of the Generative Language REST API.
    pub api_base_url: String,

    /// Title heading used by the DOCX and PDF exports.
    pub document_title: String,

    /// Font size of the PDF export body text, in points. Default: 11.
    pub pdf_font_size: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            char_budget: 15_000,
            model_policy: ModelPolicy::default(),
            temperature: 0.7,
            max_output_tokens: 8192,
            request_timeout_secs: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            document_title: DEFAULT_DOCUMENT_TITLE.to_string(),
            pdf_font_size: 11.0,
        }
    }
}

impl fmt::Debug for SynthesisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisConfig")
            .field("char_budget", &self.char_budget)
            .field("model_policy", &self.model_policy)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("api_base_url", &self.api_base_url)
            .field("document_title", &self.document_title)
            .field("pdf_font_size", &self.pdf_font_size)
            .finish()
    }
}

impl SynthesisConfig {
    /// Create a new builder for `SynthesisConfig`.
    pub fn builder() -> SynthesisConfigBuilder {
        SynthesisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SynthesisConfig`].
#[derive(Debug)]
pub struct SynthesisConfigBuilder {
    config: SynthesisConfig,
}

impl SynthesisConfigBuilder {
    pub fn char_budget(mut self, chars: usize) -> Self {
        self.config.char_budget = chars;
        self
    }

    pub fn model_policy(mut self, policy: ModelPolicy) -> Self {
        self.config.model_policy = policy;
        self
    }

    /// Shorthand for `model_policy(ModelPolicy::Static(model))`.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model_policy = ModelPolicy::Static(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn document_title(mut self, title: impl Into<String>) -> Self {
        self.config.document_title = title.into();
        self
    }

    pub fn pdf_font_size(mut self, pt: f32) -> Self {
        self.config.pdf_font_size = pt;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SynthesisConfig, NexusPathError> {
        let c = &self.config;
        if c.char_budget == 0 {
            return Err(NexusPathError::InvalidConfig(
                "Character budget must be ≥ 1".into(),
            ));
        }
        if c.max_output_tokens == 0 {
            return Err(NexusPathError::InvalidConfig(
                "Max output tokens must be ≥ 1".into(),
            ));
        }
        if !PDF_FONT_SIZE_RANGE.contains(&c.pdf_font_size) {
            return Err(NexusPathError::InvalidConfig(format!(
                "PDF font size must be 4–72 pt, got {}",
                c.pdf_font_size
            )));
        }
        match &c.model_policy {
            ModelPolicy::Static(model) if model.trim().is_empty() => {
                return Err(NexusPathError::InvalidConfig(
                    "Static model identifier must not be empty".into(),
                ));
            }
            ModelPolicy::Discover { priority } if priority.is_empty() => {
                return Err(NexusPathError::InvalidConfig(
                    "Model priority list must not be empty".into(),
                ));
            }
            _ => {}
        }
        if !c.api_base_url.starts_with("http://") && !c.api_base_url.starts_with("https://") {
            return Err(NexusPathError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the synthesis client picks a model.
///
/// | Policy | Backend calls per synthesis |
/// |--------|-----------------------------|
/// | `Static` | generate only |
/// | `Discover` (default) | list models, then generate |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelPolicy {
    /// Always use this identifier; no catalog lookup.
    Static(String),
    /// Query the catalog on every call and take the first available
    /// identifier from `priority`, else the catalog's first entry.
    Discover { priority: Vec<String> },
}

impl Default for ModelPolicy {
    fn default() -> Self {
        ModelPolicy::Discover {
            priority: DEFAULT_MODEL_PRIORITY.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Output language requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    Spanish,
    French,
    German,
    Portuguese,
    Italian,
    Dutch,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Portuguese,
        Language::Italian,
        Language::Dutch,
    ];

    /// English name of the language, as interpolated into prompts.
    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Portuguese => "Portuguese",
            Language::Italian => "Italian",
            Language::Dutch => "Dutch",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = NexusPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                NexusPathError::InvalidConfig(format!(
                    "Unsupported language '{s}' (expected one of: {})",
                    Language::ALL.map(Language::name).join(", ")
                ))
            })
    }
}

/// What the model is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskMode {
    /// An instructional summary of the text.
    Summary,
    /// A synthesised multi-book life action plan. (default)
    #[default]
    Plan,
}

impl fmt::Display for TaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskMode::Summary => f.write_str("Summary"),
            TaskMode::Plan => f.write_str("Plan"),
        }
    }
}

/// Per-session user choices. Held in memory only.
#[derive(Clone, Default)]
pub struct Preferences {
    pub language: Language,
    pub task_mode: TaskMode,
    /// Backend API key supplied by the user. Never logged.
    pub api_key: Option<String>,
}

impl Preferences {
    pub fn new(language: Language, task_mode: TaskMode) -> Self {
        Self {
            language,
            task_mode,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// The API key, if one was entered and is not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

impl fmt::Debug for Preferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preferences")
            .field("language", &self.language)
            .field("task_mode", &self.task_mode)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

use serde::Deserialize;

/// GitHub's search API caps `first` at 100.
const MAX_PAGE_SIZE: u32 = 100;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub github: GitHubConfig,
    pub defaults: Defaults,
    /// Language choices offered by the front end. The core accepts any value.
    pub languages: Vec<LanguageOption>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            github: GitHubConfig::default(),
            defaults: Defaults::default(),
            languages: vec![
                LanguageOption {
                    value: "javascript".to_owned(),
                    label: "JavaScript".to_owned(),
                },
                LanguageOption {
                    value: "java".to_owned(),
                    label: "Java".to_owned(),
                },
            ],
        }
    }
}

impl AppConfig {
    /// Whether `language` is one of the configured choices.
    pub fn offers_language(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l.value == language)
    }
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub host: String,
    /// Issues per page. Clamped to `1..=100`.
    pub page_size: u32,
    pub cache_ttl_minutes: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            host: "github.com".to_owned(),
            page_size: 10,
            cache_ttl_minutes: 5,
        }
    }
}

impl GitHubConfig {
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Used when the URL carries no `language` parameter.
    pub language: String,
    /// Used when the URL `labels` parameter yields no labels.
    pub labels: Vec<String>,
    pub date_format: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            language: String::new(),
            labels: Vec::new(),
            date_format: "relative".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LanguageOption {
    pub value: String,
    pub label: String,
}

use std::collections::HashMap;
use std::fmt;

/// Default Notion API origin.
pub const DEFAULT_NOTION_API_URL: &str = "https://api.notion.com";

/// Notion API version sent with every request. This version exposes
/// data sources beneath databases.
pub const NOTION_VERSION: &str = "2025-09-03";

/// Default cap on relayed image bodies (20 MiB).
pub const DEFAULT_IMAGE_MAX_BYTES: u64 = 20 * 1024 * 1024;

/// A logical collection backed by one Notion database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Outfits,
    ReferenceImages,
    Prompts,
    VariationPrompts,
    ContentCalendar,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 5] = [
        Self::Outfits,
        Self::ReferenceImages,
        Self::Prompts,
        Self::VariationPrompts,
        Self::ContentCalendar,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Outfits => "outfits",
            Self::ReferenceImages => "reference-images",
            Self::Prompts => "prompts",
            Self::VariationPrompts => "variation-prompts",
            Self::ContentCalendar => "content-calendar",
        }
    }

    /// Environment variable holding this collection's database id.
    pub fn env_var(self) -> &'static str {
        match self {
            Self::Outfits => "NOTION_OUTFITS_DATABASE_ID",
            Self::ReferenceImages => "NOTION_REFERENCE_IMAGES_DATABASE_ID",
            Self::Prompts => "NOTION_PROMPTS_DATABASE_ID",
            Self::VariationPrompts => "NOTION_VARIATION_PROMPTS_DATABASE_ID",
            Self::ContentCalendar => "NOTION_CALENDAR_DATABASE_ID",
        }
    }

    pub fn is_writable(self) -> bool {
        matches!(self, Self::ReferenceImages | Self::ContentCalendar)
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notion client configuration loaded from environment variables.
///
/// Missing credentials are kept as `None` so that only requests touching
/// the affected collection fail; the server still starts.
#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub database_ids: HashMap<CollectionKind, String>,
    /// Upper bound on relayed image size in bytes.
    pub image_max_bytes: u64,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_NOTION_API_URL.to_string(),
            database_ids: HashMap::new(),
            image_max_bytes: DEFAULT_IMAGE_MAX_BYTES,
        }
    }
}

impl NotionConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                                 | Default                  |
    /// |-----------------------------------------|--------------------------|
    /// | `NOTION_API_KEY`                        | unset                    |
    /// | `NOTION_API_URL`                        | `https://api.notion.com` |
    /// | `NOTION_OUTFITS_DATABASE_ID`            | unset                    |
    /// | `NOTION_REFERENCE_IMAGES_DATABASE_ID`   | unset                    |
    /// | `NOTION_PROMPTS_DATABASE_ID`            | unset                    |
    /// | `NOTION_VARIATION_PROMPTS_DATABASE_ID`  | unset                    |
    /// | `NOTION_CALENDAR_DATABASE_ID`           | unset                    |
    /// | `IMAGE_PROXY_MAX_BYTES`                 | `20971520`               |
    pub fn from_env() -> Self {
        let non_empty = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_ids = CollectionKind::ALL
            .into_iter()
            .filter_map(|kind| non_empty(kind.env_var()).map(|id| (kind, id)))
            .collect();

        let image_max_bytes: u64 = non_empty("IMAGE_PROXY_MAX_BYTES")
            .map(|v| v.parse().expect("IMAGE_PROXY_MAX_BYTES must be a valid u64"))
            .unwrap_or(DEFAULT_IMAGE_MAX_BYTES);

        Self {
            api_key: non_empty("NOTION_API_KEY"),
            api_url: non_empty("NOTION_API_URL").unwrap_or_else(|| DEFAULT_NOTION_API_URL.into()),
            database_ids,
            image_max_bytes,
        }
    }
}

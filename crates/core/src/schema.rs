//! Notion schema model and heuristic role detection.
//!
//! A user-configured database can name its columns anything. Role detection
//! decides which property plays each semantic part (title, publish date,
//! platform, attachments, ...) by matching names against a regex and checking
//! the declared property type, falling back to the first property of a
//! preferred type when no name matches.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Property kinds
// ---------------------------------------------------------------------------

/// Declared type of a Notion property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Title,
    RichText,
    Number,
    Select,
    MultiSelect,
    Status,
    Date,
    People,
    Files,
    Checkbox,
    Url,
    Email,
    PhoneNumber,
    Formula,
    Relation,
    Rollup,
    CreatedTime,
    LastEditedTime,
    Unknown,
}

impl PropertyKind {
    /// Parse the `type` string of a Notion property. Unrecognised types map
    /// to [`PropertyKind::Unknown`].
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "title" => Self::Title,
            "rich_text" => Self::RichText,
            "number" => Self::Number,
            "select" => Self::Select,
            "multi_select" => Self::MultiSelect,
            "status" => Self::Status,
            "date" => Self::Date,
            "people" => Self::People,
            "files" => Self::Files,
            "checkbox" => Self::Checkbox,
            "url" => Self::Url,
            "email" => Self::Email,
            "phone_number" => Self::PhoneNumber,
            "formula" => Self::Formula,
            "relation" => Self::Relation,
            "rollup" => Self::Rollup,
            "created_time" => Self::CreatedTime,
            "last_edited_time" => Self::LastEditedTime,
            _ => Self::Unknown,
        }
    }

    /// Whether the property declares a fixed list of named options.
    pub fn has_options(self) -> bool {
        matches!(self, Self::Select | Self::MultiSelect | Self::Status)
    }

    /// The wire name used as the `type` tag and payload key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::RichText => "rich_text",
            Self::Number => "number",
            Self::Select => "select",
            Self::MultiSelect => "multi_select",
            Self::Status => "status",
            Self::Date => "date",
            Self::People => "people",
            Self::Files => "files",
            Self::Checkbox => "checkbox",
            Self::Url => "url",
            Self::Email => "email",
            Self::PhoneNumber => "phone_number",
            Self::Formula => "formula",
            Self::Relation => "relation",
            Self::Rollup => "rollup",
            Self::CreatedTime => "created_time",
            Self::LastEditedTime => "last_edited_time",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// A single property definition from a data source schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub kind: PropertyKind,
    /// Declared option names for select, multi-select and status properties.
    pub options: Vec<String>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            options: Vec::new(),
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

/// Ordered property definitions of one data source.
///
/// Order is the external API's declared order. Role fallback picks the
/// "first" property of a kind, so callers must never sort this.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    properties: Vec<PropertyDescriptor>,
}

impl Schema {
    pub fn new(properties: Vec<PropertyDescriptor>) -> Self {
        Self { properties }
    }

    /// Build a schema from a Notion data source (or database) object.
    ///
    /// Reads the `properties` map; entries without a `type` are skipped.
    pub fn from_notion(object: &Value) -> Self {
        let Some(map) = object.get("properties").and_then(Value::as_object) else {
            return Self::default();
        };

        let properties = map
            .iter()
            .filter_map(|(name, def)| {
                let type_name = def.get("type").and_then(Value::as_str)?;
                let kind = PropertyKind::from_type_name(type_name);
                let options = if kind.has_options() {
                    def.get(type_name)
                        .and_then(|cfg| cfg.get("options"))
                        .and_then(Value::as_array)
                        .map(|opts| {
                            opts.iter()
                                .filter_map(|o| o.get("name").and_then(Value::as_str))
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                Some(PropertyDescriptor {
                    name: name.clone(),
                    kind,
                    options,
                })
            })
            .collect();

        Self { properties }
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn get(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Option names of the named property, empty when it has none.
    pub fn options_for(&self, name: &str) -> &[String] {
        self.get(name).map(|p| p.options.as_slice()).unwrap_or(&[])
    }

    pub fn first_of_kind(&self, kind: PropertyKind) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.kind == kind)
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Semantic purpose a property can play for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Title,
    Date,
    Platform,
    Category,
    Files,
    Favourite,
    Prompt,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Date => "date",
            Self::Platform => "platform",
            Self::Category => "category",
            Self::Files => "files",
            Self::Favourite => "favourite",
            Self::Prompt => "prompt",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detection rule for one role.
pub struct RoleRule {
    pub role: Role,
    /// Name patterns tried in order; an earlier tier always wins.
    pub name_tiers: Vec<Regex>,
    /// Kinds a name match must also have.
    pub kinds: &'static [PropertyKind],
    /// Kinds tried in order when no name matches.
    pub fallback: &'static [PropertyKind],
}

impl RoleRule {
    fn new(
        role: Role,
        patterns: &[&str],
        kinds: &'static [PropertyKind],
        fallback: &'static [PropertyKind],
    ) -> Self {
        let name_tiers = patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).expect("valid regex"))
            .collect();
        Self {
            role,
            name_tiers,
            kinds,
            fallback,
        }
    }

    /// Resolve this rule against a schema.
    pub fn resolve<'a>(&self, schema: &'a Schema) -> Option<&'a PropertyDescriptor> {
        for pattern in &self.name_tiers {
            let hit = schema
                .properties()
                .iter()
                .find(|p| self.kinds.contains(&p.kind) && pattern.is_match(&p.name));
            if hit.is_some() {
                return hit;
            }
        }
        self.fallback
            .iter()
            .find_map(|kind| schema.first_of_kind(*kind))
    }
}

const TITLE_KINDS: &[PropertyKind] = &[PropertyKind::Title];
const DATE_KINDS: &[PropertyKind] = &[PropertyKind::Date];
const FILES_KINDS: &[PropertyKind] = &[PropertyKind::Files];
const CHOICE_KINDS: &[PropertyKind] = &[
    PropertyKind::Select,
    PropertyKind::MultiSelect,
    PropertyKind::Status,
    PropertyKind::RichText,
];
const CATEGORY_FALLBACK: &[PropertyKind] = &[
    PropertyKind::Select,
    PropertyKind::MultiSelect,
    PropertyKind::Status,
];
const TEXT_KINDS: &[PropertyKind] = &[PropertyKind::RichText];
const FLAG_KINDS: &[PropertyKind] = &[
    PropertyKind::Checkbox,
    PropertyKind::Select,
    PropertyKind::Status,
    PropertyKind::RichText,
];
const FLAG_FALLBACK: &[PropertyKind] = &[PropertyKind::Checkbox];

fn title_rule() -> RoleRule {
    RoleRule::new(
        Role::Title,
        &[r"title|name|caption|headline"],
        TITLE_KINDS,
        TITLE_KINDS,
    )
}

fn files_rule() -> RoleRule {
    RoleRule::new(
        Role::Files,
        &[r"image|photo|picture|media|file|asset|visual"],
        FILES_KINDS,
        FILES_KINDS,
    )
}

/// Roles used by the content calendar.
pub static CALENDAR_RULES: LazyLock<Vec<RoleRule>> = LazyLock::new(|| {
    vec![
        title_rule(),
        RoleRule::new(
            Role::Date,
            &[r"publish\s*date", r"date|day|schedul|post"],
            DATE_KINDS,
            DATE_KINDS,
        ),
        RoleRule::new(
            Role::Platform,
            &[r"platform|channel|network|social"],
            CHOICE_KINDS,
            CHOICE_KINDS,
        ),
        files_rule(),
    ]
});

/// Roles used by outfit and reference-image collections.
pub static MEDIA_RULES: LazyLock<Vec<RoleRule>> = LazyLock::new(|| {
    vec![
        title_rule(),
        RoleRule::new(
            Role::Category,
            &[r"type|category|kind|format"],
            CHOICE_KINDS,
            CATEGORY_FALLBACK,
        ),
        files_rule(),
    ]
});

/// Roles used by prompt collections.
pub static PROMPT_RULES: LazyLock<Vec<RoleRule>> = LazyLock::new(|| {
    vec![
        title_rule(),
        RoleRule::new(
            Role::Prompt,
            &[r"^prompt", r"prompt|text|description|content"],
            TEXT_KINDS,
            TEXT_KINDS,
        ),
        RoleRule::new(
            Role::Favourite,
            &[r"fav|star|like|pick"],
            FLAG_KINDS,
            FLAG_FALLBACK,
        ),
    ]
});

// ---------------------------------------------------------------------------
// Key map
// ---------------------------------------------------------------------------

/// Resolved role -> property mapping. A missing role is valid and means the
/// features depending on it are unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaKeyMap {
    keys: BTreeMap<Role, PropertyDescriptor>,
}

impl SchemaKeyMap {
    pub fn key(&self, role: Role) -> Option<&str> {
        self.keys.get(&role).map(|p| p.name.as_str())
    }

    pub fn property(&self, role: Role) -> Option<&PropertyDescriptor> {
        self.keys.get(&role)
    }

    /// Like [`property`](Self::property) but a missing role is a validation
    /// error, for write paths that cannot proceed without it.
    pub fn require(&self, role: Role) -> Result<&PropertyDescriptor, CoreError> {
        self.property(role).ok_or_else(|| {
            CoreError::Validation(format!(
                "Database schema has no property usable as {role}; check the Notion database columns"
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Detect which property plays each role in `rules`.
pub fn detect_keys(schema: &Schema, rules: &[RoleRule]) -> SchemaKeyMap {
    let keys = rules
        .iter()
        .filter_map(|rule| rule.resolve(schema).map(|p| (rule.role, p.clone())))
        .collect();
    SchemaKeyMap { keys }
}

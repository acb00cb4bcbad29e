//! Image-generation model registry, request validation and payload rules.
//!
//! The provider exposes no discriminated request schema, so every model is
//! registered with an explicit [`ModelFamily`] that decides the payload shape.
//! Validation runs before any network call; a rejected request leaves the job
//! tracker idle.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Model families
// ---------------------------------------------------------------------------

/// Request shape a model expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Edits one or more reference images; `images` is mandatory.
    EditWithImages,
    /// Takes an explicit `size` of `"W*H"`.
    SizeParameterized,
    /// Takes `aspect_ratio` plus a `resolution` tier.
    AspectResolutionParameterized,
    /// Prompt plus optional images, nothing else.
    Generic,
}

/// A registered provider model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSpec {
    pub id: String,
    pub label: String,
    pub family: ModelFamily,
}

/// Known models, in display order.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("google/nano-banana/edit", "Nano Banana Edit", ModelFamily::EditWithImages)
            .register("google/nano-banana-pro/edit", "Nano Banana Pro Edit", ModelFamily::EditWithImages)
            .register("bytedance/seedream-v4/edit", "Seedream v4 Edit", ModelFamily::EditWithImages)
            .register("bytedance/seedream-v4", "Seedream v4", ModelFamily::SizeParameterized)
            .register(
                "google/nano-banana-pro/text-to-image",
                "Nano Banana Pro",
                ModelFamily::AspectResolutionParameterized,
            )
            .register("google/imagen4", "Imagen 4", ModelFamily::Generic);
        registry
    }
}

impl ModelRegistry {
    pub fn empty() -> Self {
        Self { models: Vec::new() }
    }

    /// Register a model. Re-registering an id replaces its entry in place.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        label: impl Into<String>,
        family: ModelFamily,
    ) -> &mut Self {
        let spec = ModelSpec {
            id: id.into(),
            label: label.into(),
            family,
        };
        match self.models.iter_mut().find(|m| m.id == spec.id) {
            Some(existing) => *existing = spec,
            None => self.models.push(spec),
        }
        self
    }

    pub fn get(&self, id: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn models(&self) -> &[ModelSpec] {
        &self.models
    }
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// Aspect ratios offered by the dimension picker.
pub const ASPECT_RATIOS: &[&str] = &[
    "1:1", "2:3", "3:2", "3:4", "4:3", "4:5", "5:4", "9:16", "16:9", "21:9",
];

/// A validated `W:H` aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const SQUARE: Self = Self {
        width: 1,
        height: 1,
    };

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let value = value.trim();
        if !ASPECT_RATIOS.contains(&value) {
            return Err(CoreError::Validation(format!(
                "Unknown dimension '{value}'. Valid dimensions: {}",
                ASPECT_RATIOS.join(", ")
            )));
        }
        let (w, h) = value
            .split_once(':')
            .ok_or_else(|| CoreError::Internal(format!("malformed aspect ratio '{value}'")))?;
        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|e| CoreError::Internal(format!("malformed aspect ratio '{value}': {e}")))
        };
        Ok(Self {
            width: parse(w)?,
            height: parse(h)?,
        })
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// Output resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1k")]
    OneK,
    #[serde(rename = "2k")]
    TwoK,
    #[serde(rename = "4k")]
    FourK,
}

impl Resolution {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1k" => Ok(Self::OneK),
            "2k" => Ok(Self::TwoK),
            "4k" => Ok(Self::FourK),
            other => Err(CoreError::Validation(format!(
                "Unknown resolution '{other}'. Valid resolutions: 1k, 2k, 4k"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneK => "1k",
            Self::TwoK => "2k",
            Self::FourK => "4k",
        }
    }

    /// Pixel length of the longer edge.
    pub fn long_edge(self) -> u32 {
        match self {
            Self::OneK => 1024,
            Self::TwoK => 2048,
            Self::FourK => 4096,
        }
    }
}

/// Pixel size for an aspect ratio at a resolution tier.
///
/// The long edge is fixed by the tier; the short edge follows the ratio and
/// is rounded to a multiple of 8.
pub fn pixel_size(ratio: AspectRatio, resolution: Resolution) -> (u32, u32) {
    let long = resolution.long_edge();
    let scale = |short: u32, long_part: u32| {
        let exact = f64::from(long) * f64::from(short) / f64::from(long_part);
        ((exact / 8.0).round() as u32).max(1) * 8
    };
    if ratio.width >= ratio.height {
        (long, scale(ratio.height, ratio.width))
    } else {
        (scale(ratio.width, ratio.height), long)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A generation request as submitted by the front end.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub model: String,
    #[serde(default)]
    pub dimension: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    /// Data URLs or remote URLs, in the order the user picked them.
    #[serde(default)]
    pub reference_images: Vec<String>,
}

/// A validated request with its provider payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedGeneration {
    pub model: ModelSpec,
    pub dimension: Option<AspectRatio>,
    pub resolution: Resolution,
    pub prompt: String,
    pub reference_images: Vec<String>,
    pub payload: Value,
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Validate a request against the registry and build its payload.
pub fn prepare(
    registry: &ModelRegistry,
    request: &GenerationRequest,
) -> Result<PreparedGeneration, CoreError> {
    let model = registry.get(request.model.trim()).ok_or_else(|| {
        CoreError::Validation(format!("Unknown model '{}'", request.model.trim()))
    })?;

    let images: Vec<String> = request
        .reference_images
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    let prompt = request.prompt.as_deref().unwrap_or_default().trim().to_string();

    if model.family == ModelFamily::EditWithImages && images.is_empty() {
        return Err(CoreError::Validation(format!(
            "Model '{}' edits images and needs at least one reference image",
            model.label
        )));
    }
    if prompt.is_empty() && images.is_empty() {
        return Err(CoreError::Validation(
            "Enter a prompt or add a reference image".to_string(),
        ));
    }

    let dimension = blank_to_none(request.dimension.as_deref())
        .map(AspectRatio::parse)
        .transpose()?;
    let resolution = blank_to_none(request.resolution.as_deref())
        .map(Resolution::parse)
        .transpose()?
        .unwrap_or(Resolution::TwoK);

    let payload = build_payload(model.family, &prompt, &images, dimension, resolution);

    Ok(PreparedGeneration {
        model: model.clone(),
        dimension,
        resolution,
        prompt,
        reference_images: images,
        payload,
    })
}

/// Provider request body for a model family.
pub fn build_payload(
    family: ModelFamily,
    prompt: &str,
    images: &[String],
    dimension: Option<AspectRatio>,
    resolution: Resolution,
) -> Value {
    let mut body = Map::new();
    body.insert("prompt".into(), json!(prompt));

    match family {
        ModelFamily::EditWithImages => {
            body.insert("images".into(), json!(images));
            body.insert("output_format".into(), json!("png"));
            if let Some(ratio) = dimension {
                body.insert("aspect_ratio".into(), json!(ratio.to_string()));
            }
        }
        ModelFamily::SizeParameterized => {
            let (w, h) = pixel_size(dimension.unwrap_or(AspectRatio::SQUARE), resolution);
            body.insert("size".into(), json!(format!("{w}*{h}")));
        }
        ModelFamily::AspectResolutionParameterized => {
            let ratio = dimension.unwrap_or(AspectRatio::SQUARE);
            body.insert("aspect_ratio".into(), json!(ratio.to_string()));
            body.insert("resolution".into(), json!(resolution.as_str()));
        }
        ModelFamily::Generic => {}
    }

    if family != ModelFamily::EditWithImages && !images.is_empty() {
        body.insert("images".into(), json!(images));
    }

    Value::Object(body)
}

// ---------------------------------------------------------------------------
// Job status
// ---------------------------------------------------------------------------

/// Lifecycle of a tracked generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobStatus {
    /// Whether the job can no longer change state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }
}

use serde::{Deserialize, Serialize};

/// A single class the model can predict
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    /// Stable identifier returned to API clients (e.g. "dog")
    pub id: String,
    /// Human readable name shown in the UI (e.g. "🐶 Dog")
    pub name: String,
}

impl Label {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Build a label from a display name, deriving the id by lowercasing it
    pub fn from_display(name: &str) -> Self {
        let name = name.trim();
        Self::new(name.to_lowercase(), name)
    }
}

/// Ordered, non-empty set of class labels. Index `i` of the model output maps to `get(i)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<Label>,
}

impl LabelSet {
    /// Returns `None` when `labels` is empty
    pub fn new(labels: Vec<Label>) -> Option<Self> {
        if labels.is_empty() {
            None
        } else {
            Some(Self { labels })
        }
    }

    /// Build a label set from display names, skipping blank entries
    pub fn from_names<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels = names
            .into_iter()
            .filter(|name| !name.as_ref().trim().is_empty())
            .map(|name| Label::from_display(name.as_ref()))
            .collect();
        Self::new(labels)
    }

    /// Labels from the metadata file, or the default two-class set when the
    /// metadata is absent or carries no usable labels
    pub fn from_metadata(metadata: Option<&ModelMetadata>) -> Self {
        metadata
            .and_then(|m| m.labels.as_ref())
            .and_then(|names| Self::from_names(names))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Label> {
        self.labels.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.id.clone()).collect()
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            labels: vec![Label::new("cat", "🐱 Cat"), Label::new("dog", "🐶 Dog")],
        }
    }
}

/// Pixel scaling applied before inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// `v / 255`, values in [0, 1]
    #[default]
    Unit,
    /// `v / 127.5 - 1`, values in [-1, 1]
    Symmetric,
}

impl Normalization {
    pub fn apply(self, value: u8) -> f32 {
        match self {
            Normalization::Unit => value as f32 / 255.0,
            Normalization::Symmetric => value as f32 / 127.5 - 1.0,
        }
    }
}

/// Memory layout of the 4-D input tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// [batch, height, width, channels] (Keras / TensorFlow exports)
    Nhwc,
    /// [batch, channels, height, width] (PyTorch exports)
    Nchw,
}

/// Input shape the model expects, excluding the batch dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub height: u32,
    pub width: u32,
    pub channels: u32,
    pub layout: TensorLayout,
}

impl InputShape {
    /// Square RGB input in NHWC layout
    pub fn square(size: u32) -> Self {
        Self {
            height: size,
            width: size,
            channels: 3,
            layout: TensorLayout::Nhwc,
        }
    }

    /// Interpret fixed 4-D dims (batch first). The layout is NCHW when the
    /// second dim looks like a channel count and the last one does not.
    pub fn from_dims(dims: [usize; 4]) -> Option<Self> {
        let is_channels = |n: usize| matches!(n, 1 | 3 | 4);
        let (layout, channels, height, width) = if is_channels(dims[1]) && !is_channels(dims[3]) {
            (TensorLayout::Nchw, dims[1], dims[2], dims[3])
        } else {
            (TensorLayout::Nhwc, dims[3], dims[1], dims[2])
        };

        if !is_channels(channels) || height == 0 || width == 0 {
            return None;
        }

        Some(Self {
            height: u32::try_from(height).ok()?,
            width: u32::try_from(width).ok()?,
            channels: channels as u32,
            layout,
        })
    }

    /// Full tensor dims including the leading batch dimension of 1
    pub fn dims(&self) -> [usize; 4] {
        let (h, w, c) = (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        );
        match self.layout {
            TensorLayout::Nhwc => [1, h, w, c],
            TensorLayout::Nchw => [1, c, h, w],
        }
    }

    pub fn element_count(&self) -> usize {
        self.dims().iter().product()
    }
}

/// Contents of the `metadata.json` file stored next to the model weights
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub image_size: Option<u32>,
    #[serde(default)]
    pub normalization: Option<Normalization>,
}

/// Confidence for one class, as a percentage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
    pub class: String,
    pub confidence: f64,
}

/// Result of classifying one image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Index into the active label set
    pub index: usize,
    pub class: String,
    pub class_name: String,
    /// Percentage in [0, 100], rounded to two decimals
    pub confidence: f64,
    /// Per-class confidences in label order
    pub scores: Vec<ClassScore>,
}

use serde::{Deserialize, Serialize};

/// Layout hint carried by a slide's opening tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Default,
    Left,
    Right,
    Vertical,
    Custom(String),
}

impl Layout {
    /// Interpret the value of a `layout="..."` attribute. Unknown values are kept verbatim.
    pub fn from_attr(value: &str) -> Self {
        let value = value.trim();
        match value.to_ascii_lowercase().as_str() {
            "" | "default" => Layout::Default,
            "left" => Layout::Left,
            "right" => Layout::Right,
            "vertical" => Layout::Vertical,
            _ => Layout::Custom(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
}

/// A typed fragment of a slide, in the order it appeared in the markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    Bullets { items: Vec<BulletItem> },
    Image { query: String },
    Notes { text: String },
    /// Element the dialect does not know about, captured as plain text.
    Raw { tag: String, text: String },
}

impl ContentBlock {
    pub fn is_heading(&self) -> bool {
        matches!(self, ContentBlock::Heading { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub index: usize,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
    /// Closing marker not seen yet.
    #[serde(default)]
    pub generating: bool,
}

impl Slide {
    pub fn new(index: usize, layout: Layout) -> Self {
        Self {
            index,
            layout,
            blocks: Vec::new(),
            generating: false,
        }
    }

    /// Text of the first heading, if any.
    pub fn title(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            ContentBlock::Heading { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineRequest {
    pub prompt: String,
    pub number_of_cards: usize,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlidesRequest {
    pub title: String,
    pub outline: Vec<String>,
    pub language: String,
    pub tone: String,
}

/// Body of a presentation update. Absent fields are left untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresentationContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slides: Option<Vec<Slide>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Vec<String>>,
}

impl PresentationContent {
    pub fn slides(slides: Vec<Slide>) -> Self {
        Self {
            slides: Some(slides),
            outline: None,
        }
    }

    pub fn outline(outline: Vec<String>) -> Self {
        Self {
            slides: None,
            outline: Some(outline),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationCreate {
    pub title: String,
    pub content: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    pub user_email: String,
}

/// Stored presentation as returned by the backend. `content` is owned by the backend schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageResponse {
    pub success: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

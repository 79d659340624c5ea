use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Content type
// ---------------------------------------------------------------------------

/// The six deliverable content kinds a chapter can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    FreeNotes,
    PremiumNotes,
    UltraPdf,
    VideoLecture,
    McqPractice,
    AiNotes,
}

impl ContentType {
    pub const ALL: [ContentType; 6] = [
        ContentType::FreeNotes,
        ContentType::PremiumNotes,
        ContentType::UltraPdf,
        ContentType::VideoLecture,
        ContentType::McqPractice,
        ContentType::AiNotes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::FreeNotes => "FREE_NOTES",
            ContentType::PremiumNotes => "PREMIUM_NOTES",
            ContentType::UltraPdf => "ULTRA_PDF",
            ContentType::VideoLecture => "VIDEO_LECTURE",
            ContentType::McqPractice => "MCQ_PRACTICE",
            ContentType::AiNotes => "AI_NOTES",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FREE_NOTES" => Some(ContentType::FreeNotes),
            "PREMIUM_NOTES" => Some(ContentType::PremiumNotes),
            "ULTRA_PDF" => Some(ContentType::UltraPdf),
            "VIDEO_LECTURE" => Some(ContentType::VideoLecture),
            "MCQ_PRACTICE" => Some(ContentType::McqPractice),
            "AI_NOTES" => Some(ContentType::AiNotes),
            _ => None,
        }
    }

    /// Content generated on demand by the content-fetch collaborator rather
    /// than authored by an admin.
    pub fn is_generated(&self) -> bool {
        matches!(self, ContentType::McqPractice | ContentType::AiNotes)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Composite content key
// ---------------------------------------------------------------------------

/// Identifies one chapter's catalog record.
///
/// `composite()` renders the deterministic storage key. Injectivity holds as
/// long as no component contains `':'` (names come from fixed curriculum
/// lists, which never do); the stream component participates only for
/// classes 11 and 12, where streams exist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentKey {
    pub board: String,
    pub class_level: String,
    #[serde(default)]
    pub stream: Option<String>,
    pub subject: String,
    pub chapter_id: String,
}

impl ContentKey {
    pub fn new(
        board: impl Into<String>,
        class_level: impl Into<String>,
        stream: Option<String>,
        subject: impl Into<String>,
        chapter_id: impl Into<String>,
    ) -> Self {
        Self {
            board: board.into(),
            class_level: class_level.into(),
            stream,
            subject: subject.into(),
            chapter_id: chapter_id.into(),
        }
    }

    fn stream_suffix(&self) -> String {
        match (&self.stream, self.class_level.as_str()) {
            (Some(stream), "11" | "12") => format!("-{stream}"),
            _ => String::new(),
        }
    }

    /// The sole catalog lookup key: `content:{board}:{class}[-stream]:{subject}:{chapter}`.
    pub fn composite(&self) -> String {
        format!(
            "content:{}:{}{}:{}:{}",
            self.board,
            self.class_level,
            self.stream_suffix(),
            self.subject,
            self.chapter_id
        )
    }
}

// ---------------------------------------------------------------------------
// Catalog record
// ---------------------------------------------------------------------------

/// One playlist entry for video lectures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoItem {
    pub title: String,
    pub url: String,
}

/// Per-composite-key catalog payload.
///
/// Field absence means that tier of content does not exist for the chapter —
/// distinct from a present payload priced at 0 (exists and free). The core
/// only reads these records; admin flows and the content-fetch collaborator
/// write them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(default)]
    pub free_notes_html: Option<String>,
    #[serde(default)]
    pub premium_notes_html: Option<String>,
    #[serde(default)]
    pub free_link: Option<String>,
    #[serde(default)]
    pub premium_link: Option<String>,
    #[serde(default)]
    pub ultra_pdf_link: Option<String>,
    #[serde(default)]
    pub free_video_link: Option<String>,
    #[serde(default)]
    pub premium_video_link: Option<String>,
    #[serde(default)]
    pub video_playlist: Vec<VideoItem>,
    /// Opaque AI-generated lesson payload (MCQ sets, AI notes).
    #[serde(default)]
    pub ai_payload: Option<Value>,
    /// Admin price override in credits. `None` falls back to the settings
    /// default for the content type.
    #[serde(default)]
    pub price: Option<u32>,
    /// Video-specific price override.
    #[serde(default)]
    pub video_credits_cost: Option<u32>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl CatalogRecord {
    /// Whether this record carries a payload for `content_type` at all.
    pub fn has_payload(&self, content_type: ContentType) -> bool {
        match content_type {
            ContentType::FreeNotes => self.free_notes_html.is_some() || self.free_link.is_some(),
            ContentType::PremiumNotes => {
                self.premium_notes_html.is_some() || self.premium_link.is_some()
            }
            ContentType::UltraPdf => self.ultra_pdf_link.is_some(),
            ContentType::VideoLecture => {
                !self.video_playlist.is_empty()
                    || self.free_video_link.is_some()
                    || self.premium_video_link.is_some()
            }
            ContentType::McqPractice | ContentType::AiNotes => self.ai_payload.is_some(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::message::truncate_content;

pub const DEFAULT_EMBED_COLOR: u32 = 0x0099FF;
pub const MAX_TITLE_CHARS: usize = 256;
pub const MAX_DESCRIPTION_CHARS: usize = 4096;
pub const MAX_FOOTER_CHARS: usize = 2048;
pub const MAX_FIELDS: usize = 25;
pub const MAX_FIELD_NAME_CHARS: usize = 256;
pub const MAX_FIELD_VALUE_CHARS: usize = 1024;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbedInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub footer: Option<String>,
    /// When true the embed is stamped with the send time.
    #[serde(default)]
    pub timestamp: bool,
    #[serde(default)]
    pub fields: Vec<EmbedFieldInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedFieldInput {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// An embed clamped to the platform's size limits.
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: u32,
    pub footer: Option<String>,
    pub timestamp: bool,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Embed {
    pub fn from_input(input: &EmbedInput) -> Self {
        let clamp = |s: &Option<String>, limit: usize| {
            s.as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| truncate_content(s, limit).0)
        };

        Self {
            title: clamp(&input.title, MAX_TITLE_CHARS),
            description: clamp(&input.description, MAX_DESCRIPTION_CHARS),
            color: input.color.unwrap_or(DEFAULT_EMBED_COLOR),
            footer: clamp(&input.footer, MAX_FOOTER_CHARS),
            timestamp: input.timestamp,
            fields: input
                .fields
                .iter()
                .take(MAX_FIELDS)
                .map(|f| EmbedField {
                    name: truncate_content(&f.name, MAX_FIELD_NAME_CHARS).0,
                    value: truncate_content(&f.value, MAX_FIELD_VALUE_CHARS).0,
                    inline: f.inline,
                })
                .collect(),
        }
    }
}

use serde::{Deserialize, Deserializer, Serialize};

use super::embed::{Embed, EmbedInput};

/// Hard limit on message content length, counted in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Body of `POST /sendmessage`. Every field is optional at the parsing layer
/// so that missing fields surface as `InvalidArgument` instead of a
/// framework rejection.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SendMessage {
    #[serde(default, deserialize_with = "string_or_number")]
    pub channel_id: Option<String>,
    pub content: Option<String>,
    /// Legacy name for `content`, still sent by older clients.
    pub other: Option<String>,
    pub embed: Option<EmbedInput>,
}

impl SendMessage {
    /// The message text, preferring `content` over the legacy `other` field.
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| self.other.as_deref().filter(|c| !c.trim().is_empty()))
    }
}

/// Validated, clamped payload handed to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub content: String,
    pub embed: Option<Embed>,
}

/// What the gateway reports back after a successful send.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub id: String,
    pub channel_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendReceipt {
    pub success: bool,
    pub message_id: String,
    pub channel_id: String,
    pub timestamp: String,
    pub truncated: bool,
}

/// Cut `content` to at most `limit` characters. Applying it twice yields
/// the same result as applying it once.
pub fn truncate_content(content: &str, limit: usize) -> (String, bool) {
    match content.char_indices().nth(limit) {
        Some((byte_idx, _)) => (content[..byte_idx].to_string(), true),
        None => (content.to_string(), false),
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preferred_over_other() {
        let msg: SendMessage =
            serde_json::from_str(r#"{"channel_id":"1","content":"a","other":"b"}"#).unwrap();
        assert_eq!(msg.text(), Some("a"));
    }

    #[test]
    fn test_other_used_when_content_missing() {
        let msg: SendMessage = serde_json::from_str(r#"{"channel_id":"1","other":"b"}"#).unwrap();
        assert_eq!(msg.text(), Some("b"));
    }

    #[test]
    fn test_blank_content_falls_back_to_other() {
        let msg: SendMessage =
            serde_json::from_str(r#"{"channel_id":"1","content":"  ","other":"b"}"#).unwrap();
        assert_eq!(msg.text(), Some("b"));
    }

    #[test]
    fn test_numeric_channel_id_accepted() {
        let msg: SendMessage =
            serde_json::from_str(r#"{"channel_id":123456789012345678,"content":"x"}"#).unwrap();
        assert_eq!(msg.channel_id.as_deref(), Some("123456789012345678"));
    }

    #[test]
    fn test_missing_channel_id_is_none() {
        let msg: SendMessage = serde_json::from_str(r#"{"content":"x"}"#).unwrap();
        assert!(msg.channel_id.is_none());
    }

    #[test]
    fn test_truncate_long_content() {
        let long = "a".repeat(2500);
        let (out, truncated) = truncate_content(&long, MAX_CONTENT_CHARS);
        assert!(truncated);
        assert_eq!(out.chars().count(), 2000);
        assert_eq!(truncate_content(&out, MAX_CONTENT_CHARS), (out.clone(), false));
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let long = "é".repeat(2001);
        let (out, truncated) = truncate_content(&long, MAX_CONTENT_CHARS);
        assert!(truncated);
        assert_eq!(out.chars().count(), 2000);
        assert_eq!(out, "é".repeat(2000));
    }

    #[test]
    fn test_short_content_untouched() {
        assert_eq!(truncate_content("hello", 2000), ("hello".to_string(), false));
        assert_eq!(truncate_content("", 2000), (String::new(), false));
    }
}

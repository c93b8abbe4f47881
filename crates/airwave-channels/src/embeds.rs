//! Embed construction for the radio relay.

use serde::Serialize;

/// Discord blurple-adjacent blue used for all relay embeds.
pub const EMBED_COLOR: u32 = 0x3498DB;

/// Discord caps an embed field value at 1024 characters.
pub const FIELD_VALUE_LIMIT: usize = 1024;

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// Split content into field-sized chunks on char boundaries. Always
/// returns at least one chunk so an embed field is never empty.
pub fn chunk_field_value(content: &str, limit: usize) -> Vec<String> {
    if content.is_empty() {
        return vec![String::new()];
    }
    let mut chunks = Vec::new();
    let mut current = String::new();
    for c in content.chars() {
        if current.chars().count() == limit {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    chunks.push(current);
    chunks
}

/// Field-per-chunk embed; continuation fields get a zero-width name so
/// long messages read as one block.
fn chunked_embed(first_field_name: &str, content: &str, footer: &str) -> Embed {
    let fields = chunk_field_value(content, FIELD_VALUE_LIMIT)
        .into_iter()
        .enumerate()
        .map(|(i, value)| EmbedField {
            name: if i == 0 {
                first_field_name.to_string()
            } else {
                "\u{200b}".to_string()
            },
            value,
            inline: false,
        })
        .collect();
    Embed {
        color: EMBED_COLOR,
        fields,
        footer: Some(EmbedFooter {
            text: footer.to_string(),
        }),
    }
}

/// The anonymized repost shown in the radio channel.
pub fn radio_embed(content: &str) -> Embed {
    chunked_embed(
        "The radio crackles to life and you hear a voice...:",
        content,
        "Airwave Radio",
    )
}

/// The attributed mirror for the admin log channel.
pub fn admin_log_embed(author_name: &str, author_id: u64, content: &str) -> Embed {
    chunked_embed(
        &format!("User: {author_name} ID: {author_id} | Sent a radio message:"),
        content,
        "Airwave Radio Admin Log",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_content_is_one_chunk() {
        assert_eq!(chunk_field_value("hello", 1024), vec!["hello"]);
    }

    #[test]
    fn test_empty_content_still_yields_a_chunk() {
        assert_eq!(chunk_field_value("", 1024), vec![""]);
    }

    #[test]
    fn test_long_content_splits_at_limit() {
        let content = "x".repeat(2500);
        let chunks = chunk_field_value(&content, 1024);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1024);
        assert_eq!(chunks[1].len(), 1024);
        assert_eq!(chunks[2].len(), 452);
    }

    #[test]
    fn test_chunking_respects_char_boundaries() {
        let content = "é".repeat(1030);
        let chunks = chunk_field_value(&content, 1024);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 1024);
        assert_eq!(chunks[1].chars().count(), 6);
    }

    #[test]
    fn test_radio_embed_layout() {
        let embed = radio_embed("test message");
        assert_eq!(embed.fields.len(), 1);
        assert!(embed.fields[0].name.starts_with("The radio crackles"));
        assert_eq!(embed.fields[0].value, "test message");
        assert_eq!(embed.footer.as_ref().unwrap().text, "Airwave Radio");
    }

    #[test]
    fn test_admin_embed_names_the_author() {
        let embed = admin_log_embed("listener42", 9001, "hi");
        assert!(embed.fields[0].name.contains("listener42"));
        assert!(embed.fields[0].name.contains("9001"));
        assert_eq!(embed.footer.as_ref().unwrap().text, "Airwave Radio Admin Log");
    }

    #[test]
    fn test_long_message_spans_multiple_fields() {
        let embed = radio_embed(&"y".repeat(1500));
        assert_eq!(embed.fields.len(), 2);
        assert_eq!(embed.fields[1].name, "\u{200b}");
    }
}

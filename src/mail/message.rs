//! Validated message model handed to the delivery orchestrator.

use super::mime::Email;

/// One decoded MIME part carrying media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPart {
    /// Filename declared by the part, or a fallback.
    pub file_name: String,
    /// Decoded content bytes.
    pub content: Vec<u8>,
    /// Declared content type, e.g. `image/png`.
    pub content_type: String,
}

/// How a media part is dispatched to the chat API.
///
/// Closed variant over declared content-type prefixes, matched in fixed
/// priority order: image, video, audio, else document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    /// Classify a declared content type.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("image/") {
            MediaKind::Photo
        } else if content_type.starts_with("video/") {
            MediaKind::Video
        } else if content_type.starts_with("audio/") {
            MediaKind::Audio
        } else {
            MediaKind::Document
        }
    }
}

/// A parsed and validated inbound message, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    /// Message-ID header value, non-empty. Dedup key together with the
    /// destination chat.
    pub message_id: String,
    /// Subject header, possibly empty.
    pub subject: String,
    /// From header, possibly empty.
    pub from: String,
    /// To header, possibly empty.
    pub to: String,
    /// Plain-text body.
    pub text: String,
    /// Inline media parts, in document order.
    pub inlines: Vec<MediaPart>,
    /// Attachment parts, in document order.
    pub attachments: Vec<MediaPart>,
}

impl ParsedMessage {
    /// Build a validated message from a parsed email.
    ///
    /// Returns None if the Message-ID header is absent or empty.
    pub fn from_email(email: Email) -> Option<Self> {
        let message_id = normalize_message_id(email.message_id.as_deref()?)?;
        Some(Self {
            message_id,
            subject: email.subject,
            from: email.from,
            to: email.to,
            text: email.text,
            inlines: email.inlines,
            attachments: email.attachments,
        })
    }

    /// The text actually sent to a chat: header block plus body.
    pub fn composed_text(&self) -> String {
        format!(
            "Subject: {}\nFrom: {}\nTo: {}\n\n{}",
            self.subject, self.from, self.to, self.text
        )
    }
}

/// Trim whitespace and one pair of angle brackets off a Message-ID.
fn normalize_message_id(raw: &str) -> Option<String> {
    let id = raw
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_email() -> Email {
        Email {
            message_id: Some("<m1@example.org>".to_string()),
            subject: "Hello".to_string(),
            from: "sender@remote.org".to_string(),
            to: "abc@example.org".to_string(),
            text: "hi".to_string(),
            inlines: vec![],
            attachments: vec![],
        }
    }

    #[test]
    fn test_media_kind_priority_order() {
        assert_eq!(MediaKind::from_content_type("image/png"), MediaKind::Photo);
        assert_eq!(MediaKind::from_content_type("image/jpeg"), MediaKind::Photo);
        assert_eq!(MediaKind::from_content_type("video/mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_content_type("audio/ogg"), MediaKind::Audio);
        assert_eq!(
            MediaKind::from_content_type("application/pdf"),
            MediaKind::Document
        );
        assert_eq!(MediaKind::from_content_type("text/csv"), MediaKind::Document);
        assert_eq!(MediaKind::from_content_type(""), MediaKind::Document);
    }

    #[test]
    fn test_from_email_normalizes_message_id() {
        let message = ParsedMessage::from_email(sample_email()).unwrap();
        assert_eq!(message.message_id, "m1@example.org");
    }

    #[test]
    fn test_from_email_requires_message_id() {
        let mut email = sample_email();
        email.message_id = None;
        assert!(ParsedMessage::from_email(email).is_none());

        let mut email = sample_email();
        email.message_id = Some("  <> ".to_string());
        assert!(ParsedMessage::from_email(email).is_none());
    }

    #[test]
    fn test_composed_text_layout() {
        let message = ParsedMessage::from_email(sample_email()).unwrap();
        assert_eq!(
            message.composed_text(),
            "Subject: Hello\nFrom: sender@remote.org\nTo: abc@example.org\n\nhi"
        );
    }
}

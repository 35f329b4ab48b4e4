//! MIME parsing boundary.
//!
//! Wraps the `mailparse` crate so the rest of the engine only sees a
//! header lookup, a plain-text body and ordered inline/attachment part
//! lists. Nothing outside this module touches raw MIME structure.

use mailparse::{DispositionType, MailHeaderMap, ParsedMail};

use super::message::MediaPart;
use crate::{PostgateError, Result};

/// Fallback filename for parts that declare none.
const DEFAULT_FILE_NAME: &str = "attachment";

/// Decoded view of an inbound email.
#[derive(Debug, Clone, Default)]
pub struct Email {
    /// Message-ID header value, if present.
    pub message_id: Option<String>,
    /// Subject header, empty if absent.
    pub subject: String,
    /// From header, empty if absent.
    pub from: String,
    /// To header, empty if absent.
    pub to: String,
    /// First text/plain body found, empty if none.
    pub text: String,
    /// Inline media parts, in document order.
    pub inlines: Vec<MediaPart>,
    /// Attachment parts, in document order.
    pub attachments: Vec<MediaPart>,
}

/// Parse raw message bytes into an [`Email`].
pub fn parse_email(raw: &[u8]) -> Result<Email> {
    let parsed = mailparse::parse_mail(raw).map_err(|e| PostgateError::Parse(e.to_string()))?;

    let mut email = Email {
        message_id: parsed.headers.get_first_value("Message-ID"),
        subject: parsed.headers.get_first_value("Subject").unwrap_or_default(),
        from: parsed.headers.get_first_value("From").unwrap_or_default(),
        to: parsed.headers.get_first_value("To").unwrap_or_default(),
        ..Email::default()
    };

    collect_parts(&parsed, &mut email)?;
    Ok(email)
}

/// Walk the MIME tree, filling body text and part lists in order.
fn collect_parts(part: &ParsedMail, email: &mut Email) -> Result<()> {
    if part.ctype.mimetype.starts_with("multipart/") {
        for sub in &part.subparts {
            collect_parts(sub, email)?;
        }
        return Ok(());
    }

    let disposition = part.get_content_disposition();
    let file_name = disposition
        .params
        .get("filename")
        .cloned()
        .or_else(|| part.ctype.params.get("name").cloned());

    if disposition.disposition == DispositionType::Attachment {
        email.attachments.push(media_part(part, file_name)?);
        return Ok(());
    }

    match part.ctype.mimetype.as_str() {
        // The first bare text/plain leaf is the body.
        "text/plain" if email.text.is_empty() && file_name.is_none() => {
            email.text = part
                .get_body()
                .map_err(|e| PostgateError::Parse(e.to_string()))?;
        }
        // Alternative renderings of the body are not forwarded.
        "text/html" if file_name.is_none() => {}
        _ => {
            email.inlines.push(media_part(part, file_name)?);
        }
    }
    Ok(())
}

fn media_part(part: &ParsedMail, file_name: Option<String>) -> Result<MediaPart> {
    let content = part
        .get_body_raw()
        .map_err(|e| PostgateError::Parse(e.to_string()))?;
    Ok(MediaPart {
        file_name: file_name.unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
        content,
        content_type: part.ctype.mimetype.clone(),
    })
}

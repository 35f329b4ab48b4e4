//! Inbound mail handling for postgate.
//!
//! One [`Envelope`] tracks a single SMTP transaction from open to close;
//! [`mime`] wraps the external MIME parser; [`message`] is the validated
//! form handed to the delivery orchestrator.

mod envelope;
pub mod message;
pub mod mime;

pub use envelope::{Envelope, Rejection};
pub use message::{MediaKind, MediaPart, ParsedMessage};

/// Split an email address into lowercase (local part, host).
///
/// Returns None unless the address contains exactly one `@` with
/// non-empty parts on both sides. Surrounding whitespace and a single
/// pair of angle brackets are tolerated.
pub fn split_address(address: &str) -> Option<(String, String)> {
    let address = address
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_lowercase();
    let parts: Vec<&str> = address.split('@').collect();
    match parts.as_slice() {
        [user, host] if !user.is_empty() && !host.is_empty() => {
            Some((user.to_string(), host.to_string()))
        }
        _ => None,
    }
}

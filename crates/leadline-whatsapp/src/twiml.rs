// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TwiML rendering for webhook replies.

/// Content type Twilio expects for a messaging response.
pub const TWIML_CONTENT_TYPE: &str = "application/xml";

/// Wraps `text` in a single-message TwiML response.
pub fn message_response(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        escape_xml(text)
    )
}

/// Escapes the five XML special characters.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_wrapped() {
        assert_eq!(
            message_response("Hello!"),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>Hello!</Message></Response>"
        );
    }

    #[test]
    fn markup_is_escaped() {
        let xml = message_response("Tom & Jerry's <b>\"deal\"</b>");
        assert!(xml.contains("Tom &amp; Jerry&apos;s &lt;b&gt;&quot;deal&quot;&lt;/b&gt;"));
        assert!(!xml.contains("<b>"));
    }

    #[test]
    fn unicode_passes_through() {
        assert_eq!(escape_xml("नमस्ते 👋"), "नमस्ते 👋");
    }
}

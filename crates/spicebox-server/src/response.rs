//! Tool responses: an ordered list of text and image parts.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::plot::RenderedPlot;

/// One part of a tool response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    Text {
        text: String,
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    Image {
        /// Base64-encoded bytes.
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text {
            text: text.into(),
            mime_type: None,
        }
    }

    pub fn text_with_mime(text: impl Into<String>, mime_type: &str) -> Self {
        ContentPart::Text {
            text: text.into(),
            mime_type: Some(mime_type.to_string()),
        }
    }

    pub fn image(bytes: &[u8], mime_type: &str) -> Self {
        ContentPart::Image {
            data: STANDARD.encode(bytes),
            mime_type: mime_type.to_string(),
        }
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            ContentPart::Text { mime_type, .. } => mime_type.as_deref(),
            ContentPart::Image { mime_type, .. } => Some(mime_type),
        }
    }
}

/// Successful result of a tool call. The first part is always a JSON summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResponse {
    pub content: Vec<ContentPart>,
}

impl ToolResponse {
    /// Response whose only part is `summary` as pretty-printed JSON.
    pub fn json<S: Serialize + ?Sized>(summary: &S) -> Result<Self> {
        Ok(Self {
            content: vec![ContentPart::text(serde_json::to_string_pretty(summary)?)],
        })
    }

    pub fn with_part(mut self, part: ContentPart) -> Self {
        self.content.push(part);
        self
    }

    /// Append a rendered plot as an image part.
    pub fn with_plot(self, plot: &RenderedPlot) -> Self {
        self.with_part(ContentPart::image(&plot.bytes, plot.format.mime_type()))
    }

    /// The JSON summary, parsed back into a value.
    pub fn summary(&self) -> Option<Value> {
        match self.content.first()? {
            ContentPart::Text { text, .. } => serde_json::from_str(text).ok(),
            ContentPart::Image { .. } => None,
        }
    }

    pub fn images(&self) -> impl Iterator<Item = &ContentPart> {
        self.content
            .iter()
            .filter(|p| matches!(p, ContentPart::Image { .. }))
    }

    /// Decoded bytes of the first image part with the given MIME type.
    pub fn image_bytes(&self, mime_type: &str) -> Option<Vec<u8>> {
        self.content.iter().find_map(|part| match part {
            ContentPart::Image { data, mime_type: m } if m == mime_type => STANDARD.decode(data).ok(),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_part_serialization() {
        let text = serde_json::to_value(ContentPart::text("hi")).unwrap();
        assert_eq!(text, json!({"type": "text", "text": "hi"}));

        let svg = serde_json::to_value(ContentPart::text_with_mime("<svg/>", "image/svg+xml")).unwrap();
        assert_eq!(svg["mimeType"], "image/svg+xml");

        let image = serde_json::to_value(ContentPart::image(&[1, 2, 3], "image/png")).unwrap();
        assert_eq!(image, json!({"type": "image", "data": "AQID", "mimeType": "image/png"}));
    }

    #[test]
    fn test_summary_round_trip() {
        let response = ToolResponse::json(&json!({"count": 0}))
            .unwrap()
            .with_part(ContentPart::image(b"abc", "image/png"));
        assert_eq!(response.summary().unwrap()["count"], 0);
        assert_eq!(response.images().count(), 1);
        assert_eq!(response.image_bytes("image/png").unwrap(), b"abc");
        assert!(response.image_bytes("image/svg+xml").is_none());
    }
}

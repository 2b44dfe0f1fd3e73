// Изображения и вложения

use super::parse_payload_value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub file_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentPayload {
    pub file_url: String,
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ImagePayload {
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_value(parse_payload_value(raw)?).ok()
    }
}

impl AttachmentPayload {
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_value(parse_payload_value(raw)?).ok()
    }

    /// Размер в человекочитаемом виде
    pub fn display_size(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        match self.file_size {
            s if s >= MB => format!("{:.1} MB", s as f64 / MB as f64),
            s if s >= KB => format!("{:.1} KB", s as f64 / KB as f64),
            s => format!("{} B", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_parse_and_size() {
        let file = AttachmentPayload::parse(
            r#"{"fileUrl":"https://cdn/x.pdf","fileName":"offer.pdf","fileSize":1572864}"#,
        )
        .unwrap();
        assert_eq!(file.display_size(), "1.5 MB");
        assert!(AttachmentPayload::parse(r#"{"fileUrl":"x"}"#).is_none());
    }

    #[test]
    fn test_image_parse() {
        let image = ImagePayload::parse(r#"{"fileUrl":"https://cdn/a.png","width":640}"#).unwrap();
        assert_eq!(image.width, Some(640));
        assert!(image.file_name.is_none());
    }
}

//! `data:` URI decoding for inline buffers and images.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// A decoded `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// MIME type from the URI header, if present.
    pub mime_type: Option<String>,
    /// Decoded payload.
    pub data: Vec<u8>,
}

impl DataUri {
    /// Whether `uri` uses the `data:` scheme.
    pub fn is_data_uri(uri: &str) -> bool {
        uri.starts_with("data:")
    }

    /// Parse a `data:[<mime>][;base64],<payload>` URI.
    ///
    /// Only base64 payloads are supported, which is what glTF exporters emit.
    pub fn parse(uri: &str) -> Result<Self, String> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| "not a data URI".to_string())?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| "data URI has no payload separator".to_string())?;

        let mut parts = header.split(';');
        let mime_type = parts
            .next()
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
            return Err("only base64 data URIs are supported".to_string());
        }

        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| format!("invalid base64 payload: {e}"))?;

        Ok(Self { mime_type, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_mime() {
        let uri = DataUri::parse("data:application/octet-stream;base64,AQID").expect("parse");
        assert_eq!(uri.mime_type.as_deref(), Some("application/octet-stream"));
        assert_eq!(uri.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_without_mime() {
        let uri = DataUri::parse("data:;base64,AQID").expect("parse");
        assert!(uri.mime_type.is_none());
    }

    #[test]
    fn test_rejects_plain_payload() {
        assert!(DataUri::parse("data:text/plain,hello").is_err());
        assert!(DataUri::parse("textures/a.png").is_err());
    }
}

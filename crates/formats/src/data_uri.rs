use base64::Engine as _;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataUriError {
    NotDataUri,
    MissingComma,
    Base64(String),
}

impl std::fmt::Display for DataUriError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataUriError::NotDataUri => write!(f, "not a data: uri"),
            DataUriError::MissingComma => write!(f, "data uri has no payload separator"),
            DataUriError::Base64(e) => write!(f, "base64 payload: {e}"),
        }
    }
}

impl std::error::Error for DataUriError {}

pub fn is_data_uri(uri: &str) -> bool {
    uri.len() >= 5 && uri[..5].eq_ignore_ascii_case("data:")
}

/// Decode a `data:[<mime>][;base64],<payload>` URI.
///
/// Non-base64 payloads are taken verbatim; glTF exporters only emit base64.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, DataUriError> {
    if !is_data_uri(uri) {
        return Err(DataUriError::NotDataUri);
    }
    let (header, payload) = uri[5..].split_once(',').ok_or(DataUriError::MissingComma)?;
    if header.to_ascii_lowercase().ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| DataUriError::Base64(e.to_string()))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::{DataUriError, decode_data_uri, is_data_uri};

    #[test]
    fn decodes_base64_payload() {
        let bytes = decode_data_uri("data:application/octet-stream;base64,AQID").unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn plain_payload_is_verbatim() {
        assert_eq!(decode_data_uri("data:,hi").unwrap(), b"hi".to_vec());
    }

    #[test]
    fn rejects_malformed() {
        assert!(!is_data_uri("models/floor.glb"));
        assert_eq!(decode_data_uri("triangle.bin"), Err(DataUriError::NotDataUri));
        assert_eq!(decode_data_uri("data:abc"), Err(DataUriError::MissingComma));
        assert!(matches!(
            decode_data_uri("data:;base64,@@@"),
            Err(DataUriError::Base64(_))
        ));
    }
}

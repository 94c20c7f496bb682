//! Common helpers shared across models.

/// Parse an images JSON array from the database
pub fn parse_images(json: Option<&str>) -> Vec<String> {
    json.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

/// Serialize image paths to JSON for the database
pub fn serialize_images(images: &[String]) -> Option<String> {
    if images.is_empty() {
        None
    } else {
        serde_json::to_string(images).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_images_roundtrip() {
        let images = vec!["uploads/a.jpg".to_string(), "uploads/b.png".to_string()];
        let json = serialize_images(&images).unwrap();
        assert_eq!(parse_images(Some(&json)), images);
    }

    #[test]
    fn test_parse_images_handles_garbage() {
        assert!(parse_images(None).is_empty());
        assert!(parse_images(Some("not json")).is_empty());
    }

    #[test]
    fn test_serialize_empty_is_none() {
        assert!(serialize_images(&[]).is_none());
    }
}

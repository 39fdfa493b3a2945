//! Pull a JSON object out of free-form model output.

use serde_json::Value;

use crate::error::CampaignError;

/// Substring from the first `{` to the last `}` inclusive.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// [`extract_json_object`] then parse.
pub fn parse_json_object(text: &str) -> Result<Value, CampaignError> {
    let raw = extract_json_object(text).ok_or(CampaignError::NoJsonObject)?;
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_code_fences_and_prose() {
        let text = "Sure! Here you go:\n```json\n{\"Insights\": [\"a\"], \"Campaigns\": []}\n```\nEnjoy.";
        assert_eq!(
            parse_json_object(text).unwrap(),
            json!({"Insights": ["a"], "Campaigns": []})
        );
    }

    #[test]
    fn spans_first_open_to_last_close() {
        assert_eq!(extract_json_object("x {\"a\": {\"b\": 1}} y }"), Some("{\"a\": {\"b\": 1}} y }"));
    }

    #[test]
    fn missing_or_reversed_braces() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
        assert!(matches!(
            parse_json_object("nothing"),
            Err(CampaignError::NoJsonObject)
        ));
    }

    #[test]
    fn malformed_object_is_invalid_json() {
        assert!(matches!(
            parse_json_object("{\"Insights\": [}"),
            Err(CampaignError::InvalidJson(_))
        ));
    }
}

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const SETTINGS_KEY: &str = "settings";
pub const DRAFT_KEY: &str = "quickNote";

pub const STATUS_SUCCESS_TTL: Duration = Duration::from_millis(2000);
pub const STATUS_ERROR_TTL: Duration = Duration::from_millis(3000);

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub target_url: String,
    pub auth_key: String,
}

impl ServerSettings {
    pub fn new(target_url: impl Into<String>, auth_key: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            auth_key: auth_key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_options_page_shape_and_ignores_other_fields() {
        let json = r#"{"targetUrl":"https://b.example/api/v1/note/upsert","authKey":"abc","theme":"dark","includeSummaryUrl":true}"#;
        let settings: ServerSettings = serde_json::from_str(json).unwrap();
        assert_eq!(
            settings,
            ServerSettings::new("https://b.example/api/v1/note/upsert", "abc")
        );
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let settings: ServerSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, ServerSettings::default());
    }
}

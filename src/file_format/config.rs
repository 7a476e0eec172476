use std::fs;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::LoadError;

/// Who hears about it when a listener joins the custom view registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyPolicy {
    /// Every registered listener is handed its settings again.
    #[default]
    Broadcast,
    /// Only the listener being added is notified.
    Newcomer,
}

/// Schema for the xray config.json.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XrayConfig {
    /// Path to the custom views YAML document.  It may not exist yet.
    #[serde(default)]
    pub views_path: Option<String>,
    /// Overall budget for rendering a single object, in milliseconds.  No
    /// deadline when absent.
    #[serde(default)]
    pub render_timeout_ms: Option<u64>,
    #[serde(default)]
    pub listener_notify: NotifyPolicy,
}

impl XrayConfig {
    pub fn render_timeout(&self) -> Option<Duration> {
        self.render_timeout_ms.map(Duration::from_millis)
    }
}

pub fn load_config(config_path: &str) -> Result<XrayConfig, LoadError> {
    let input = fs::read_to_string(config_path).map_err(|source| LoadError::Read {
        path: config_path.to_string(),
        source,
    })?;
    serde_json::from_str(&input).map_err(|err| LoadError::Parse {
        path: config_path.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn loads_camel_case_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "viewsPath": "/tmp/views.yaml", "renderTimeoutMs": 1500, "listenerNotify": "newcomer" }}"#
        )
        .unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.views_path.as_deref(), Some("/tmp/views.yaml"));
        assert_eq!(config.render_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.listener_notify, NotifyPolicy::Newcomer);
    }

    #[test]
    fn defaults_for_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert!(config.views_path.is_none());
        assert!(config.render_timeout().is_none());
        assert_eq!(config.listener_notify, NotifyPolicy::Broadcast);
    }

    #[test]
    fn errors_name_the_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert_eq!(err.path(), path);

        let err = load_config("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }
}

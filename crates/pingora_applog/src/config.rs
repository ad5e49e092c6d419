use std::collections::BTreeMap;

use crate::error::AppLogError;

/// Environment variable holding the project the logs belong to.
pub const PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";
/// Environment variable naming the deployed service (`module_id` label).
pub const SERVICE_ENV: &str = "GAE_SERVICE";
/// Environment variable naming the deployed version (`version_id` label).
pub const VERSION_ENV: &str = "GAE_VERSION";

/// Stream name used when the caller passes an empty one.
pub const DEFAULT_STREAM_NAME: &str = "app_log";
/// Monitored resource kind attached to every stream.
pub const RESOURCE_KIND: &str = "gae_app";

/// Deployment settings for request logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppLogConfig {
    /// Project identifier (required by `wrap`)
    pub project_id: Option<String>,
    /// Service name (default: empty)
    pub service: String,
    /// Service version (default: empty)
    pub version: String,
}

impl AppLogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the settings through `lookup`, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            project_id: lookup(PROJECT_ENV).filter(|p| !p.is_empty()),
            service: lookup(SERVICE_ENV).unwrap_or_default(),
            version: lookup(VERSION_ENV).unwrap_or_default(),
        }
    }

    /// Set project identifier
    pub fn project_id(mut self, project: impl Into<String>) -> Self {
        self.project_id = Some(project.into()).filter(|p| !p.is_empty());
        self
    }

    /// Set service name
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Set service version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Resource-name prefix, `projects/<id>`.
    pub fn parent(&self) -> Result<String, AppLogError> {
        self.project_id
            .as_deref()
            .map(|p| format!("projects/{p}"))
            .ok_or(AppLogError::MissingProject(PROJECT_ENV))
    }

    /// Labels describing the deployment, attached to the stream's resource.
    pub fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("module_id".to_string(), self.service.clone()),
            ("version_id".to_string(), self.version.clone()),
            (
                "project_id".to_string(),
                self.project_id.clone().unwrap_or_default(),
            ),
        ])
    }
}

/// Substitute the default for an empty stream name.
pub fn stream_name_or_default(name: &str) -> &str {
    if name.is_empty() {
        DEFAULT_STREAM_NAME
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_all_deployment_values() {
        let cfg = AppLogConfig::from_lookup(env(&[
            (PROJECT_ENV, "my-proj"),
            (SERVICE_ENV, "default"),
            (VERSION_ENV, "20261019t120000"),
        ]));
        assert_eq!(cfg.parent().unwrap(), "projects/my-proj");

        let labels = cfg.labels();
        assert_eq!(labels["module_id"], "default");
        assert_eq!(labels["version_id"], "20261019t120000");
        assert_eq!(labels["project_id"], "my-proj");
    }

    #[test]
    fn optional_labels_default_to_empty() {
        let cfg = AppLogConfig::from_lookup(env(&[(PROJECT_ENV, "p")]));
        let labels = cfg.labels();
        assert_eq!(labels["module_id"], "");
        assert_eq!(labels["version_id"], "");
    }

    #[test]
    fn missing_or_empty_project_is_a_config_error() {
        let cfg = AppLogConfig::from_lookup(env(&[]));
        assert!(matches!(cfg.parent(), Err(AppLogError::MissingProject(_))));

        let cfg = AppLogConfig::from_lookup(env(&[(PROJECT_ENV, "")]));
        assert!(matches!(cfg.parent(), Err(AppLogError::MissingProject(_))));

        let cfg = AppLogConfig::new().project_id("");
        assert!(cfg.parent().is_err());
    }

    #[test]
    fn empty_stream_name_gets_default() {
        assert_eq!(stream_name_or_default(""), "app_log");
        assert_eq!(stream_name_or_default("audit"), "audit");
    }
}

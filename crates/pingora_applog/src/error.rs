use thiserror::Error;

/// Failures that can occur while setting up request logging.
///
/// Emission itself never fails from the caller's point of view, so every
/// variant here surfaces from `wrap`/`AppLog::open` or client construction.
#[derive(Debug, Error)]
pub enum AppLogError {
    /// The project identifier could not be found in configuration.
    #[error("applog: {0} not set")]
    MissingProject(&'static str),

    /// The log client could not open the named stream.
    #[error("applog: failed to open log stream {stream:?}: {source}")]
    Connect {
        stream: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("applog: {0}")]
    Io(#[from] std::io::Error),
}

impl AppLogError {
    /// Wrap a client-side failure raised while opening `stream`.
    pub fn connect<E>(stream: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Connect {
            stream: stream.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_cause() {
        let err = AppLogError::MissingProject("GOOGLE_CLOUD_PROJECT");
        assert_eq!(err.to_string(), "applog: GOOGLE_CLOUD_PROJECT not set");

        let err = AppLogError::connect("app_log", "permission denied");
        assert_eq!(
            err.to_string(),
            "applog: failed to open log stream \"app_log\": permission denied"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}

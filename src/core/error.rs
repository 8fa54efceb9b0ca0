use thiserror::Error;

/// Every way a single cleanup run can fail. None of these end the process.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("unknown cleanup type: {0}")]
    UnknownType(String),

    #[error("error during cleanup of {name}: {source}")]
    ActionFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("panic during cleanup of {name}: {cause}")]
    ActionFault { name: String, cause: String },
}

impl CleanupError {
    pub fn name(&self) -> &str {
        match self {
            CleanupError::UnknownType(name) => name,
            CleanupError::ActionFailed { name, .. } => name,
            CleanupError::ActionFault { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_failed_message_carries_cause() {
        let err = CleanupError::ActionFailed {
            name: "x".to_string(),
            source: anyhow::anyhow!("boom"),
        };
        let msg = err.to_string();
        assert!(msg.contains("x"), "msg={msg}");
        assert!(msg.contains("boom"), "msg={msg}");
        assert_eq!(err.name(), "x");
    }

    #[test]
    fn unknown_type_names_the_type() {
        let err = CleanupError::UnknownType("ghost".to_string());
        assert_eq!(err.to_string(), "unknown cleanup type: ghost");
    }
}

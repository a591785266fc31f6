//! Error types for entity stores and configuration.

use crate::ecs::Tag;

/// Boxed error produced by a caller-supplied transform.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = EcsError> = std::result::Result<T, E>;

/// Errors surfaced by entity store operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    #[error("no component with tag `{tag}`")]
    ComponentNotFound { tag: Tag },

    #[error("transform failed for component `{tag}`")]
    TransformFailed {
        tag: Tag,
        #[source]
        source: BoxError,
    },

    #[error("malformed component: {0}")]
    MalformedComponent(String),

    #[error("payload of component `{tag}` is not a `{expected}`")]
    PayloadType { tag: Tag, expected: &'static str },

    #[error("entity worker has terminated")]
    Terminated,

    /// The entity's mailbox stayed full for the whole timeout. The request
    /// was never queued, so it has no effect.
    #[error("entity mailbox stayed full for {millis}ms")]
    Timeout { millis: u64 },

    #[error("entities must be spawned inside a Tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EcsError {
    pub(crate) fn payload_type<V>(tag: &Tag) -> Self {
        EcsError::PayloadType {
            tag: tag.clone(),
            expected: std::any::type_name::<V>(),
        }
    }

    /// Turns a panic raised by caller code into a transform failure.
    pub(crate) fn from_panic(tag: &Tag, panic: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(message) = panic.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = panic.downcast_ref::<String>() {
            message.clone()
        } else {
            "transform panicked".to_string()
        };
        EcsError::TransformFailed {
            tag: tag.clone(),
            source: message.into(),
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn transform_failure_keeps_its_source() {
        let err = EcsError::TransformFailed {
            tag: Tag::new("hp"),
            source: "negative health".into(),
        };
        assert_eq!(err.to_string(), "transform failed for component `hp`");
        assert_eq!(err.source().unwrap().to_string(), "negative health");
    }

    #[test]
    fn payload_type_names_expected_type() {
        let err = EcsError::payload_type::<i64>(&Tag::new("hp"));
        assert_eq!(err.to_string(), "payload of component `hp` is not a `i64`");
    }

    #[test]
    fn panic_payload_becomes_transform_failure() {
        let panic = std::panic::catch_unwind(|| panic!("out of mana")).unwrap_err();
        let err = EcsError::from_panic(&Tag::new("mana"), panic);
        assert!(matches!(&err, EcsError::TransformFailed { tag, .. } if tag.as_str() == "mana"));
        assert_eq!(err.source().unwrap().to_string(), "out of mana");
    }
}

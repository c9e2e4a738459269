use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum KeyringError {
    #[error("driver error: {message}")]
    Driver { message: String },
    #[error("transaction state error: {message}")]
    TransactionState { message: String },
    #[error("filter on `{field}` cannot be rendered as SQL")]
    FilterUnrenderable { field: String },
    #[error("dependency exists: {message}")]
    DependencyExists { message: String },
    #[error("schema error: {message}")]
    Schema { message: String },
    #[error("codec error: {message}")]
    Codec { message: String },
    #[error("validation error: {message}")]
    Validation { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl KeyringError {
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    pub fn transaction_state(message: impl Into<String>) -> Self {
        Self::TransactionState {
            message: message.into(),
        }
    }

    pub fn filter_unrenderable(field: impl Into<String>) -> Self {
        Self::FilterUnrenderable {
            field: field.into(),
        }
    }

    pub fn dependency_exists(message: impl Into<String>) -> Self {
        Self::DependencyExists {
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

pub type KeyringResult<T> = Result<T, KeyringError>;

impl From<sea_orm::DbErr> for KeyringError {
    fn from(value: sea_orm::DbErr) -> Self {
        KeyringError::driver(value.to_string())
    }
}

impl From<std::io::Error> for KeyringError {
    fn from(value: std::io::Error) -> Self {
        KeyringError::storage(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::KeyringError;

    #[test]
    fn helper_constructors_set_variants() {
        let err = KeyringError::driver("socket closed");
        assert!(matches!(err, KeyringError::Driver { .. }));
        let err = KeyringError::transaction_state("issuer dropped");
        assert!(matches!(err, KeyringError::TransactionState { .. }));
        let err = KeyringError::filter_unrenderable("binary");
        assert!(matches!(err, KeyringError::FilterUnrenderable { ref field } if field == "binary"));
        let err = KeyringError::dependency_exists("key has identities");
        assert!(matches!(err, KeyringError::DependencyExists { .. }));
        let err = KeyringError::schema("bad statement");
        assert!(matches!(err, KeyringError::Schema { .. }));
        let err = KeyringError::codec("truncated packet");
        assert!(matches!(err, KeyringError::Codec { .. }));
        let err = KeyringError::validation("empty insert");
        assert!(matches!(err, KeyringError::Validation { .. }));
        let err = KeyringError::storage("disk");
        assert!(matches!(err, KeyringError::Storage { .. }));
    }

    #[test]
    fn errors_are_cloneable_for_fan_out() {
        let err = KeyringError::driver("connection reset");
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
        assert_eq!(copy.to_string(), "driver error: connection reset");
    }
}

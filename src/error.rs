use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// A data table (CSV file) or a keyed row does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Caller supplied malformed input (filters, dates, entity fields).
    #[error("{0}")]
    Validation(String),

    /// Unexpected failure while shaping or aggregating data. The cause stays
    /// in the error chain for logging; callers only see `public_message`.
    #[error("{context}: {source}")]
    Processing {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn processing<E>(context: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        AppError::Processing {
            context: context.into(),
            source: source.into(),
        }
    }

    /// HTTP-equivalent status for the calling layer.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Validation(_) => 400,
            _ => 500,
        }
    }

    /// Message safe to show to an end user. Internal failures are reduced to a
    /// generic sentence; the full chain is logged where the error is handled.
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg) | AppError::Validation(msg) => msg.clone(),
            AppError::Processing { context, .. } => {
                format!("Internal error while {}", context)
            }
            _ => "Internal error while processing data".to_string(),
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.public_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status_code(), 404);
        assert_eq!(AppError::Validation("x".into()).status_code(), 400);
        let err = AppError::processing("aggregating service orders", "boom");
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_processing_keeps_cause() {
        let err = AppError::processing("aggregating service orders", "bad shape");
        assert!(err.to_string().contains("bad shape"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.public_message().contains("bad shape"));
    }

    #[test]
    fn test_serialize_uses_public_message() {
        let err = AppError::NotFound("Service order data not found".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Service order data not found\"");
    }
}

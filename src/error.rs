//! Index subsystem errors.
//!
//! Validation errors are raised before the catalog is touched. Each variant
//! carries a stable code (see [`IndexError::code`]) next to its user-facing
//! message.

use crate::types::EntityKind;

/// Errors raised by index procedures, the entity store and the command surface.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Label is missing")]
    LabelMissing,

    #[error("Field is missing")]
    FieldMissing,

    #[error("Field must be a string")]
    InvalidFieldType,

    #[error("Index already exists configuration can't be changed")]
    ConfigImmutable,

    #[error("Language is not supported: {0}")]
    UnsupportedLanguage(String),

    #[error("Stopwords must be array of strings")]
    InvalidStopwords,

    #[error("Language must be string")]
    InvalidLanguageType,

    #[error("Weight must be numeric")]
    InvalidWeightType,

    #[error("Weight must be positive, got {0}")]
    InvalidWeight(f64),

    #[error("Nostem must be bool")]
    InvalidNostemType,

    #[error("Phonetic must be a string")]
    InvalidPhoneticType,

    #[error("Phonetic algorithm is not supported: {0}")]
    UnsupportedPhonetic(String),

    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    #[error("{kind} not found: {id}")]
    EntityNotFound { kind: EntityKind, id: u32 },

    #[error("{0} id space exhausted")]
    CapacityExceeded(EntityKind),

    #[error("Properties must be a JSON object")]
    InvalidProperties,

    #[error("Unknown call: {0}")]
    UnknownCall(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IndexError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::LabelMissing => "IDX_LABEL_MISSING",
            IndexError::FieldMissing => "IDX_FIELD_MISSING",
            IndexError::InvalidFieldType => "IDX_INVALID_FIELD_TYPE",
            IndexError::ConfigImmutable => "IDX_CONFIG_IMMUTABLE",
            IndexError::UnsupportedLanguage(_) => "IDX_UNSUPPORTED_LANGUAGE",
            IndexError::InvalidStopwords => "IDX_INVALID_STOPWORDS",
            IndexError::InvalidLanguageType => "IDX_INVALID_LANGUAGE_TYPE",
            IndexError::InvalidWeightType => "IDX_INVALID_WEIGHT_TYPE",
            IndexError::InvalidWeight(_) => "IDX_INVALID_WEIGHT",
            IndexError::InvalidNostemType => "IDX_INVALID_NOSTEM_TYPE",
            IndexError::InvalidPhoneticType => "IDX_INVALID_PHONETIC_TYPE",
            IndexError::UnsupportedPhonetic(_) => "IDX_UNSUPPORTED_PHONETIC",
            IndexError::GraphNotFound(_) => "GRAPH_NOT_FOUND",
            IndexError::EntityNotFound { .. } => "ENTITY_NOT_FOUND",
            IndexError::CapacityExceeded(_) => "CAPACITY_EXCEEDED",
            IndexError::InvalidProperties => "INVALID_PROPERTIES",
            IndexError::UnknownCall(_) => "UNKNOWN_CALL",
            IndexError::InvalidCommand(_) => "INVALID_COMMAND",
            IndexError::Json(_) => "JSON_ERROR",
        }
    }

    /// True for errors produced by request validation (nothing was mutated).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            IndexError::LabelMissing
                | IndexError::FieldMissing
                | IndexError::InvalidFieldType
                | IndexError::ConfigImmutable
                | IndexError::UnsupportedLanguage(_)
                | IndexError::InvalidStopwords
                | IndexError::InvalidLanguageType
                | IndexError::InvalidWeightType
                | IndexError::InvalidWeight(_)
                | IndexError::InvalidNostemType
                | IndexError::InvalidPhoneticType
                | IndexError::UnsupportedPhonetic(_)
        )
    }
}

/// Result type for index operations
pub type Result<T> = std::result::Result<T, IndexError>;

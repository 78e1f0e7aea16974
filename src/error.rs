use thiserror::Error;

use crate::data::DataType;

/// Errors raised while accessing or invoking a COSEM object.
///
/// Every error is raised before any field of the object is assigned, so a
/// failed call leaves the object exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CosemError {
    #[error("invalid attribute index {0}")]
    InvalidAttributeIndex(u8),

    #[error("invalid method index {0}")]
    InvalidMethodIndex(u8),

    #[error("cannot convert {found:?} to {expected:?}")]
    TypeCoercion { expected: DataType, found: Option<DataType> },

    #[error("malformed {0:?} value")]
    Decode(DataType),

    #[error("value {value} is outside {min}..={max}")]
    OutOfRange { value: i64, min: i64, max: i64 },

    #[error("logical name is not known yet")]
    MissingLogicalName,

    #[error("date-time arithmetic left the encodable year range")]
    DateTimeOverflow,
}

/// Result type alias for COSEM object operations
pub type Result<T> = core::result::Result<T, CosemError>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_display_messages() {
        assert_eq!(CosemError::InvalidAttributeIndex(10).to_string(), "invalid attribute index 10");
        assert_eq!(CosemError::InvalidMethodIndex(0).to_string(), "invalid method index 0");
        assert_eq!(
            CosemError::OutOfRange { value: -1000, min: -900, max: 900 }.to_string(),
            "value -1000 is outside -900..=900"
        );
        assert_eq!(CosemError::Decode(DataType::DateTime).to_string(), "malformed DateTime value");
    }

    #[test]
    fn test_type_coercion_message_names_both_types() {
        let err = CosemError::TypeCoercion {
            expected: DataType::Long,
            found: Some(DataType::Structure),
        };
        let message = err.to_string();
        assert!(message.contains("Long"));
        assert!(message.contains("Structure"));
    }
}

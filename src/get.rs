//! Result codes answered to GET and SET requests.

use crate::error::CosemError;

/// Data-Access-Result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum DataAccessResult {
    Success = 0,
    HardwareFault = 1,
    TemporaryFailure = 2,
    ReadWriteDenied = 3,
    ObjectUndefined = 4,
    ObjectClassInconsistent = 9,
    ObjectUnavailable = 11,
    TypeUnmatched = 12,
    ScopeOfAccessViolated = 13,
    DataBlockUnavailable = 14,
    LongGetAborted = 15,
    NoLongGetInProgress = 16,
    LongSetAborted = 17,
    NoLongSetInProgress = 18,
    DataBlockNumberInvalid = 19,
    OtherReason = 250,
}

impl DataAccessResult {
    /// Returns `None` for codes outside the table.
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Success,
            1 => Self::HardwareFault,
            2 => Self::TemporaryFailure,
            3 => Self::ReadWriteDenied,
            4 => Self::ObjectUndefined,
            9 => Self::ObjectClassInconsistent,
            11 => Self::ObjectUnavailable,
            12 => Self::TypeUnmatched,
            13 => Self::ScopeOfAccessViolated,
            14 => Self::DataBlockUnavailable,
            15 => Self::LongGetAborted,
            16 => Self::NoLongGetInProgress,
            17 => Self::LongSetAborted,
            18 => Self::NoLongSetInProgress,
            19 => Self::DataBlockNumberInvalid,
            250 => Self::OtherReason,
            _ => return None,
        })
    }
}

impl From<&CosemError> for DataAccessResult {
    fn from(error: &CosemError) -> Self {
        match error {
            CosemError::InvalidAttributeIndex(_) | CosemError::InvalidMethodIndex(_) => {
                Self::ObjectUndefined
            }
            CosemError::TypeCoercion { .. } | CosemError::Decode(_) => Self::TypeUnmatched,
            CosemError::MissingLogicalName => Self::ObjectUnavailable,
            CosemError::OutOfRange { .. } | CosemError::DateTimeOverflow => Self::OtherReason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataType;

    #[test]
    fn test_from_u8_known_codes() {
        assert_eq!(DataAccessResult::from_u8(0), Some(DataAccessResult::Success));
        assert_eq!(DataAccessResult::from_u8(4), Some(DataAccessResult::ObjectUndefined));
        assert_eq!(DataAccessResult::from_u8(12), Some(DataAccessResult::TypeUnmatched));
        assert_eq!(DataAccessResult::from_u8(250), Some(DataAccessResult::OtherReason));
    }

    #[test]
    fn test_from_u8_unknown_codes() {
        for code in [5u8, 6, 7, 8, 10, 20, 100, 249, 255] {
            assert_eq!(DataAccessResult::from_u8(code), None);
        }
    }

    #[test]
    fn test_from_error() {
        assert_eq!(
            DataAccessResult::from(&CosemError::InvalidAttributeIndex(10)),
            DataAccessResult::ObjectUndefined
        );
        assert_eq!(
            DataAccessResult::from(&CosemError::TypeCoercion {
                expected: DataType::Long,
                found: Some(DataType::Structure),
            }),
            DataAccessResult::TypeUnmatched
        );
        assert_eq!(
            DataAccessResult::from(&CosemError::MissingLogicalName),
            DataAccessResult::ObjectUnavailable
        );
    }
}

//! ACTION service APDUs for invoking methods on a COSEM object.
//!
//! # APDU Tags
//! - ACTION-Request: 0xC3 (195)
//! - ACTION-Response: 0xC7 (199)
//!
//! Only the `Normal` choice (a single method, parameters in one APDU) is
//! modelled.
//!
//! ```
//! use cosem_clock::action::ActionRequestNormal;
//! use cosem_clock::ObisCode;
//!
//! let request = ActionRequestNormal {
//!     invoke_id: 0x01,
//!     class_id: 8,
//!     instance_id: ObisCode::CLOCK,
//!     method_id: 1,
//!     method_invocation_parameters: None,
//! };
//! let encoded = request.encode();
//! assert_eq!(&encoded[..2], &[0xC3, 0x01]);
//! ```

use alloc::vec::Vec;

use nom::{
    IResult,
    error::{Error, ErrorKind},
    number::complete::{be_u16, u8},
};

use crate::data::{ByteBuffer, Data};
use crate::error::CosemError;
use crate::obis_code::ObisCode;

const ACTION_REQUEST_TAG: u8 = 0xC3;
const ACTION_RESPONSE_TAG: u8 = 0xC7;
const NORMAL_CHOICE: u8 = 0x01;

/// ACTION-Request-Normal: invoke a single COSEM method.
///
/// ```text
/// C3 01 [invoke_id] [class_id:2] [instance_id:6] [method_id] [00 | 01 params]
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ActionRequestNormal {
    /// Invoke-id-and-priority octet, echoed by the response
    pub invoke_id: u8,
    /// Interface class of the target object
    pub class_id: u16,
    /// Logical name of the target object
    pub instance_id: ObisCode,
    /// Method index, starting at 1
    pub method_id: u8,
    /// Parameters, if any
    pub method_invocation_parameters: Option<Data>,
}

impl ActionRequestNormal {
    /// Encodes the request APDU.
    ///
    /// # Returns
    /// The bytes starting at the `0xC3` tag. Parameters are written as a
    /// presence flag followed by the tagged value.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer.push(ACTION_REQUEST_TAG);
        buffer.push(NORMAL_CHOICE);
        buffer.push(self.invoke_id);
        buffer.push_u16(self.class_id);
        buffer.extend_from_slice(&self.instance_id.to_bytes());
        buffer.push(self.method_id);

        match &self.method_invocation_parameters {
            Some(params) => {
                buffer.push(0x01);
                buffer.extend(params.encode());
            }
            None => buffer.push(0x00),
        }

        buffer
    }

    /// Parses a request APDU, the counterpart of [`ActionRequestNormal::encode`].
    ///
    /// # Errors
    /// A nom `Tag` error when the APDU is not ACTION-Request-Normal.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, tag) = u8(input)?;
        let (input, choice) = u8(input)?;
        if tag != ACTION_REQUEST_TAG || choice != NORMAL_CHOICE {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
        }

        let (input, invoke_id) = u8(input)?;
        let (input, class_id) = be_u16(input)?;
        let (input, instance_id) = ObisCode::parse(input)?;
        let (input, method_id) = u8(input)?;
        let (input, has_params) = u8(input)?;
        let (input, method_invocation_parameters) = if has_params != 0 {
            let (input, params) = Data::parse(input)?;
            (input, Some(params))
        } else {
            (input, None)
        };

        Ok((
            input,
            Self {
                invoke_id,
                class_id,
                instance_id,
                method_id,
                method_invocation_parameters,
            },
        ))
    }
}

/// ACTION-Response-Normal: outcome of a single method invocation.
///
/// ```text
/// C7 01 [invoke_id] [result] 00
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ActionResponseNormal {
    /// Invoke id of the request being answered
    pub invoke_id: u8,
    /// Outcome of the invocation
    pub result: ActionResult,
}

impl ActionResponseNormal {
    /// Encodes the response APDU.
    pub fn encode(&self) -> Vec<u8> {
        // Clock methods never return data, so the optional return parameters are absent.
        alloc::vec![ACTION_RESPONSE_TAG, NORMAL_CHOICE, self.invoke_id, self.result as u8, 0x00]
    }
}

/// Action-Result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum ActionResult {
    /// Method invoked
    Success = 0,
    /// Hardware fault
    HardwareFault = 1,
    /// Temporary failure
    TemporaryFailure = 2,
    /// Read/write denied
    ReadWriteDenied = 3,
    /// Unknown object or method index
    ObjectUndefined = 4,
    /// Object is of another interface class
    ObjectClassInconsistent = 9,
    /// Object not available (e.g. no logical name yet)
    ObjectUnavailable = 11,
    /// Parameters of the wrong type or malformed
    TypeUnmatched = 12,
    /// Scope of access violated
    ScopeOfAccessViolated = 13,
    /// Data block unavailable
    DataBlockUnavailable = 14,
    /// Long action aborted
    LongActionAborted = 15,
    /// No long action in progress
    NoLongActionInProgress = 16,
    /// Any other failure, including out of range parameters
    OtherReason = 250,
}

impl ActionResult {
    /// Maps a wire code back to its variant.
    ///
    /// # Returns
    /// `None` for codes outside the table.
    pub fn from_u8(code: u8) -> Option<Self> {
        Some(match code {
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
            15 => Self::LongActionAborted,
            16 => Self::NoLongActionInProgress,
            250 => Self::OtherReason,
            _ => return None,
        })
    }
}

impl From<&CosemError> for ActionResult {
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
    use alloc::vec;

    #[test]
    fn test_encode_request_without_parameters() {
        let request = ActionRequestNormal {
            invoke_id: 0x41,
            class_id: 8,
            instance_id: ObisCode::CLOCK,
            method_id: 3,
            method_invocation_parameters: None,
        };

        assert_eq!(
            request.encode(),
            vec![0xC3, 0x01, 0x41, 0x00, 0x08, 0, 0, 1, 0, 0, 255, 0x03, 0x00]
        );
    }

    #[test]
    fn test_encode_request_with_parameters() {
        let request = ActionRequestNormal {
            invoke_id: 0x01,
            class_id: 8,
            instance_id: ObisCode::CLOCK,
            method_id: 6,
            method_invocation_parameters: Some(Data::Long(-900)),
        };

        assert_eq!(
            request.encode(),
            vec![0xC3, 0x01, 0x01, 0x00, 0x08, 0, 0, 1, 0, 0, 255, 0x06, 0x01, 0x10, 0xFC, 0x7C]
        );
    }

    #[test]
    fn test_parse_request() {
        let input = [0xC3, 0x01, 0x01, 0x00, 0x08, 0, 0, 1, 0, 0, 255, 0x01, 0x01, 0x0F, 0x00];
        let (rest, request) = ActionRequestNormal::parse(&input).unwrap();

        assert!(rest.is_empty());
        assert_eq!(request.class_id, 8);
        assert_eq!(request.instance_id, ObisCode::CLOCK);
        assert_eq!(request.method_id, 1);
        assert_eq!(request.method_invocation_parameters, Some(Data::Integer(0)));
    }

    #[test]
    fn test_parse_rejects_other_apdus() {
        assert!(ActionRequestNormal::parse(&[0xC0, 0x01, 0x01]).is_err());
        assert!(ActionRequestNormal::parse(&[0xC3, 0x02, 0x01]).is_err());
    }

    #[test]
    fn test_encode_response() {
        let response = ActionResponseNormal {
            invoke_id: 0x41,
            result: ActionResult::TypeUnmatched,
        };
        assert_eq!(response.encode(), vec![0xC7, 0x01, 0x41, 12, 0x00]);
    }

    #[test]
    fn test_result_codes() {
        for code in [0u8, 1, 2, 3, 4, 9, 11, 12, 13, 14, 15, 16, 250] {
            assert_eq!(ActionResult::from_u8(code).map(|r| r as u8), Some(code));
        }
        assert_eq!(ActionResult::from_u8(5), None);
    }

    #[test]
    fn test_result_from_error() {
        assert_eq!(
            ActionResult::from(&CosemError::InvalidMethodIndex(7)),
            ActionResult::ObjectUndefined
        );
        assert_eq!(
            ActionResult::from(&CosemError::OutOfRange { value: 901, min: -900, max: 900 }),
            ActionResult::OtherReason
        );
        assert_eq!(
            ActionResult::from(&CosemError::Decode(crate::DataType::DateTime)),
            ActionResult::TypeUnmatched
        );
    }
}

use alloc::{string::String, vec::Vec};

use nom::{
    IResult, Parser,
    bytes::complete::take,
    error::{Error, ErrorKind},
    multi::count,
    number::complete::{be_f32, be_f64, be_i16, be_i32, be_i64, be_u16, be_u32, be_u64, i8, u8},
};
#[cfg(feature = "serde")]
use serde::Serialize;

use crate::date_time::DateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[non_exhaustive]
#[rustfmt::skip]
pub enum DataType {
  Null               =  0,
  Array              =  1,
  Structure          =  2,
  Bool               =  3,
  BitString          =  4,
  DoubleLong         =  5,
  DoubleLongUnsigned =  6,
  OctetString        =  9,
  VisibleString      = 10,
  Utf8String         = 12,
  BinaryCodedDecimal = 13,
  Integer            = 15,
  Long               = 16,
  Unsigned           = 17,
  LongUnsigned       = 18,
  CompactArray       = 19,
  Long64             = 20,
  Long64Unsigned     = 21,
  Enum               = 22,
  Float32            = 23,
  Float64            = 24,
  DateTime           = 25,
  Date               = 26,
  Time               = 27,
}

impl TryFrom<u8> for DataType {
    type Error = u8;

    fn try_from(dt: u8) -> Result<Self, Self::Error> {
        Ok(match dt {
            0x00 => Self::Null,
            0x01 => Self::Array,
            0x02 => Self::Structure,
            0x03 => Self::Bool,
            0x04 => Self::BitString,
            0x05 => Self::DoubleLong,
            0x06 => Self::DoubleLongUnsigned,
            0x09 => Self::OctetString,
            0x0a => Self::VisibleString,
            0x0c => Self::Utf8String,
            0x0d => Self::BinaryCodedDecimal,
            0x0f => Self::Integer,
            0x10 => Self::Long,
            0x11 => Self::Unsigned,
            0x12 => Self::LongUnsigned,
            0x13 => Self::CompactArray,
            0x14 => Self::Long64,
            0x15 => Self::Long64Unsigned,
            0x16 => Self::Enum,
            0x17 => Self::Float32,
            0x18 => Self::Float64,
            0x19 => Self::DateTime,
            0x1a => Self::Date,
            0x1b => Self::Time,
            dt => return Err(dt),
        })
    }
}

/// Big-endian writers used by the A-XDR encoder.
pub trait ByteBuffer {
    fn push_u16(&mut self, value: u16);
    fn push_i16(&mut self, value: i16);
    fn push_u32(&mut self, value: u32);
    fn push_i32(&mut self, value: i32);
    fn push_u64(&mut self, value: u64);
    fn push_i64(&mut self, value: i64);
    /// A-XDR variable-length length prefix.
    fn push_length(&mut self, len: usize);
}

impl ByteBuffer for Vec<u8> {
    fn push_u16(&mut self, value: u16) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn push_i16(&mut self, value: i16) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn push_u32(&mut self, value: u32) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn push_i32(&mut self, value: i32) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn push_u64(&mut self, value: u64) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn push_i64(&mut self, value: i64) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn push_length(&mut self, len: usize) {
        if len < 0x80 {
            self.push(len as u8);
        } else if len <= 0xFF {
            self.push(0x81);
            self.push(len as u8);
        } else if len <= 0xFFFF {
            self.push(0x82);
            self.push_u16(len as u16);
        } else {
            self.push(0x84);
            self.push_u32(len as u32);
        }
    }
}

/// A typed COSEM value.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Data {
    Null,
    Bool(bool),
    OctetString(Vec<u8>),
    VisibleString(String),
    Utf8String(String),
    Integer(i8),
    Unsigned(u8),
    Long(i16),
    LongUnsigned(u16),
    DoubleLong(i32),
    DoubleLongUnsigned(u32),
    Long64(i64),
    Long64Unsigned(u64),
    Float32(f32),
    Float64(f64),
    Enum(u8),
    DateTime(DateTime),
    Structure(Vec<Data>),
    Array(Vec<Data>),
}

fn failure<T>(input: &[u8]) -> IResult<&[u8], T> {
    Err(nom::Err::Failure(Error::new(input, ErrorKind::Fail)))
}

fn parse_length(input: &[u8]) -> IResult<&[u8], usize> {
    let (input, first) = u8(input)?;
    match first {
        0x00..=0x7F => Ok((input, usize::from(first))),
        0x81 => {
            let (input, len) = u8(input)?;
            Ok((input, usize::from(len)))
        }
        0x82 => {
            let (input, len) = be_u16(input)?;
            Ok((input, usize::from(len)))
        }
        0x84 => {
            let (input, len) = be_u32(input)?;
            Ok((input, len as usize))
        }
        _ => failure(input),
    }
}

impl Data {
    /// The wire type tag of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Data::Null => DataType::Null,
            Data::Bool(_) => DataType::Bool,
            Data::OctetString(_) => DataType::OctetString,
            Data::VisibleString(_) => DataType::VisibleString,
            Data::Utf8String(_) => DataType::Utf8String,
            Data::Integer(_) => DataType::Integer,
            Data::Unsigned(_) => DataType::Unsigned,
            Data::Long(_) => DataType::Long,
            Data::LongUnsigned(_) => DataType::LongUnsigned,
            Data::DoubleLong(_) => DataType::DoubleLong,
            Data::DoubleLongUnsigned(_) => DataType::DoubleLongUnsigned,
            Data::Long64(_) => DataType::Long64,
            Data::Long64Unsigned(_) => DataType::Long64Unsigned,
            Data::Float32(_) => DataType::Float32,
            Data::Float64(_) => DataType::Float64,
            Data::Enum(_) => DataType::Enum,
            Data::DateTime(_) => DataType::DateTime,
            Data::Structure(_) => DataType::Structure,
            Data::Array(_) => DataType::Array,
        }
    }

    /// Parses one tagged A-XDR value.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, data_type) = u8(input)?;
        let Ok(data_type) = DataType::try_from(data_type) else {
            return failure(input);
        };
        Ok(match data_type {
            DataType::Null => (input, Data::Null),
            DataType::Bool => {
                let (input, b) = u8(input)?;
                (input, Data::Bool(b != 0))
            }
            DataType::DateTime => {
                let (input, date_time) = DateTime::parse(input)?;
                (input, Data::DateTime(date_time))
            }
            DataType::Structure => {
                let (input, len) = parse_length(input)?;
                let (input, items) = count(Self::parse, len).parse(input)?;
                (input, Data::Structure(items))
            }
            DataType::Array => {
                let (input, len) = parse_length(input)?;
                let (input, items) = count(Self::parse, len).parse(input)?;
                (input, Data::Array(items))
            }
            DataType::OctetString => {
                let (input, len) = parse_length(input)?;
                let (input, bytes) = take(len).parse(input)?;
                (input, Data::OctetString(bytes.to_vec()))
            }
            DataType::VisibleString | DataType::Utf8String => {
                let (rest, len) = parse_length(input)?;
                let (rest, bytes) = take(len).parse(rest)?;
                let Ok(text) = core::str::from_utf8(bytes) else {
                    return failure(input);
                };
                let text = String::from(text);
                if data_type == DataType::VisibleString {
                    (rest, Data::VisibleString(text))
                } else {
                    (rest, Data::Utf8String(text))
                }
            }
            DataType::Float32 => {
                let (input, n) = be_f32(input)?;
                (input, Data::Float32(n))
            }
            DataType::Float64 => {
                let (input, n) = be_f64(input)?;
                (input, Data::Float64(n))
            }
            DataType::Integer => {
                let (input, n) = i8(input)?;
                (input, Data::Integer(n))
            }
            DataType::Unsigned => {
                let (input, n) = u8(input)?;
                (input, Data::Unsigned(n))
            }
            DataType::Long => {
                let (input, n) = be_i16(input)?;
                (input, Data::Long(n))
            }
            DataType::DoubleLong => {
                let (input, n) = be_i32(input)?;
                (input, Data::DoubleLong(n))
            }
            DataType::Long64 => {
                let (input, n) = be_i64(input)?;
                (input, Data::Long64(n))
            }
            DataType::Enum => {
                let (input, n) = u8(input)?;
                (input, Data::Enum(n))
            }
            DataType::LongUnsigned => {
                let (input, n) = be_u16(input)?;
                (input, Data::LongUnsigned(n))
            }
            DataType::DoubleLongUnsigned => {
                let (input, n) = be_u32(input)?;
                (input, Data::DoubleLongUnsigned(n))
            }
            DataType::Long64Unsigned => {
                let (input, n) = be_u64(input)?;
                (input, Data::Long64Unsigned(n))
            }
            DataType::BitString
            | DataType::BinaryCodedDecimal
            | DataType::CompactArray
            | DataType::Date
            | DataType::Time => return failure(input),
        })
    }

    /// Decodes a buffer holding exactly one tagged value.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match Self::parse(bytes) {
            Ok((rest, data)) if rest.is_empty() => Some(data),
            _ => None,
        }
    }

    /// Encodes this value with its data type tag.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer.push(self.data_type() as u8);

        match self {
            Data::Null => {}
            Data::Bool(b) => buffer.push(u8::from(*b)),
            Data::OctetString(bytes) => {
                buffer.push_length(bytes.len());
                buffer.extend_from_slice(bytes);
            }
            Data::VisibleString(text) | Data::Utf8String(text) => {
                buffer.push_length(text.len());
                buffer.extend_from_slice(text.as_bytes());
            }
            Data::Integer(n) => buffer.push(*n as u8),
            Data::Unsigned(n) | Data::Enum(n) => buffer.push(*n),
            Data::Long(n) => buffer.push_i16(*n),
            Data::LongUnsigned(n) => buffer.push_u16(*n),
            Data::DoubleLong(n) => buffer.push_i32(*n),
            Data::DoubleLongUnsigned(n) => buffer.push_u32(*n),
            Data::Long64(n) => buffer.push_i64(*n),
            Data::Long64Unsigned(n) => buffer.push_u64(*n),
            Data::Float32(n) => buffer.extend_from_slice(&n.to_be_bytes()),
            Data::Float64(n) => buffer.extend_from_slice(&n.to_be_bytes()),
            Data::DateTime(date_time) => buffer.extend(date_time.encode()),
            Data::Structure(items) | Data::Array(items) => {
                buffer.push_length(items.len());
                for item in items {
                    buffer.extend(item.encode());
                }
            }
        }

        buffer
    }

    /// Converts any numeric-compatible value to an integer.
    ///
    /// Accepts every integer width, enums, booleans, integral floats,
    /// numeric text, and octet strings that hold one tagged numeric value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Data::Bool(b) => Some(i64::from(*b)),
            Data::Integer(n) => Some(i64::from(*n)),
            Data::Unsigned(n) | Data::Enum(n) => Some(i64::from(*n)),
            Data::Long(n) => Some(i64::from(*n)),
            Data::LongUnsigned(n) => Some(i64::from(*n)),
            Data::DoubleLong(n) => Some(i64::from(*n)),
            Data::DoubleLongUnsigned(n) => Some(i64::from(*n)),
            Data::Long64(n) => Some(*n),
            Data::Long64Unsigned(n) => i64::try_from(*n).ok(),
            Data::Float32(n) => integral(f64::from(*n)),
            Data::Float64(n) => integral(*n),
            Data::VisibleString(text) | Data::Utf8String(text) => text.trim().parse().ok(),
            Data::OctetString(bytes) => match Self::from_bytes(bytes)? {
                Data::OctetString(_) => None,
                inner => inner.as_i64(),
            },
            Data::Null | Data::DateTime(_) | Data::Structure(_) | Data::Array(_) => None,
        }
    }

    /// Converts a value to a boolean: non-zero numbers are `true`, text may
    /// also read `true`/`false`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Data::Bool(b) => Some(*b),
            Data::VisibleString(text) | Data::Utf8String(text) => {
                let text = text.trim();
                if text.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if text.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    text.parse::<i64>().ok().map(|n| n != 0)
                }
            }
            other => other.as_i64().map(|n| n != 0),
        }
    }
}

fn integral(n: f64) -> Option<i64> {
    let truncated = n as i64;
    (truncated as f64 == n).then_some(truncated)
}

impl From<DateTime> for Data {
    fn from(value: DateTime) -> Self {
        Data::DateTime(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{string::ToString, vec};

    #[test]
    fn test_data_type_try_from_valid() {
        assert_eq!(DataType::try_from(0x00).unwrap(), DataType::Null);
        assert_eq!(DataType::try_from(0x02).unwrap(), DataType::Structure);
        assert_eq!(DataType::try_from(0x03).unwrap(), DataType::Bool);
        assert_eq!(DataType::try_from(0x09).unwrap(), DataType::OctetString);
        assert_eq!(DataType::try_from(0x0f).unwrap(), DataType::Integer);
        assert_eq!(DataType::try_from(0x10).unwrap(), DataType::Long);
        assert_eq!(DataType::try_from(0x11).unwrap(), DataType::Unsigned);
        assert_eq!(DataType::try_from(0x16).unwrap(), DataType::Enum);
        assert_eq!(DataType::try_from(0x19).unwrap(), DataType::DateTime);
    }

    #[test]
    fn test_data_type_try_from_invalid() {
        assert_eq!(DataType::try_from(0x07), Err(0x07));
        assert_eq!(DataType::try_from(0x0b), Err(0x0b));
        assert_eq!(DataType::try_from(0xFF), Err(0xFF));
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(Data::parse(&[0x00, 0xAA]).unwrap(), (&[0xAA][..], Data::Null));
        assert_eq!(Data::from_bytes(&[0x03, 0x01]), Some(Data::Bool(true)));
        assert_eq!(Data::from_bytes(&[0x0f, 0xD6]), Some(Data::Integer(-42)));
        assert_eq!(Data::from_bytes(&[0x11, 0x2A]), Some(Data::Unsigned(42)));
        assert_eq!(Data::from_bytes(&[0x10, 0xFF, 0xC4]), Some(Data::Long(-60)));
        assert_eq!(Data::from_bytes(&[0x12, 0x01, 0x00]), Some(Data::LongUnsigned(256)));
        assert_eq!(Data::from_bytes(&[0x05, 0x00, 0x00, 0x01, 0x00]), Some(Data::DoubleLong(256)));
        assert_eq!(Data::from_bytes(&[0x16, 0x05]), Some(Data::Enum(5)));
        assert_eq!(Data::from_bytes(&[0x17, 0x42, 0x28, 0x00, 0x00]), Some(Data::Float32(42.0)));
    }

    #[test]
    fn test_parse_octet_string_and_text() {
        let input = [0x09, 0x04, 0xAA, 0xBB, 0xCC, 0xDD, 0xFF];
        let (rest, data) = Data::parse(&input).unwrap();
        assert_eq!(rest, &[0xFF]);
        assert_eq!(data, Data::OctetString(vec![0xAA, 0xBB, 0xCC, 0xDD]));

        let input = [0x0a, 0x03, b'9', b'0', b'0'];
        assert_eq!(Data::from_bytes(&input), Some(Data::VisibleString("900".to_string())));
    }

    #[test]
    fn test_parse_long_length_prefix() {
        let mut input = vec![0x09, 0x81, 0x80];
        input.extend(core::iter::repeat_n(0x11, 0x80));
        match Data::from_bytes(&input) {
            Some(Data::OctetString(bytes)) => assert_eq!(bytes.len(), 0x80),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_structure_of_date_times() {
        let dt = DateTime::new(2024, 3, 1, 10, 0, 0, 0).unwrap();
        let mut input = vec![0x02, 0x02];
        input.extend(Data::DateTime(dt).encode());
        input.extend(Data::OctetString(dt.encode()).encode());

        let data = Data::from_bytes(&input).unwrap();
        assert_eq!(
            data,
            Data::Structure(vec![Data::DateTime(dt), Data::OctetString(dt.encode())])
        );
    }

    #[test]
    fn test_parse_rejects_unknown_and_truncated() {
        assert!(Data::parse(&[0x07]).is_err());
        assert!(Data::parse(&[0x10, 0x01]).is_err());
        assert!(Data::parse(&[0x09, 0x05, 0x01]).is_err());
        assert!(Data::from_bytes(&[0x11, 0x01, 0x02]).is_none());
    }

    #[test]
    fn test_encode_layouts() {
        assert_eq!(Data::Null.encode(), vec![0x00]);
        assert_eq!(Data::Integer(0).encode(), vec![0x0f, 0x00]);
        assert_eq!(Data::Long(-900).encode(), vec![0x10, 0xFC, 0x7C]);
        assert_eq!(Data::Bool(true).encode(), vec![0x03, 0x01]);
        assert_eq!(
            Data::OctetString(vec![0, 0, 1, 0, 0, 255]).encode(),
            vec![0x09, 0x06, 0, 0, 1, 0, 0, 255]
        );
        assert_eq!(
            Data::Structure(vec![Data::Unsigned(1), Data::Enum(2)]).encode(),
            vec![0x02, 0x02, 0x11, 0x01, 0x16, 0x02]
        );
    }

    #[test]
    fn test_as_i64_conversions() {
        assert_eq!(Data::Integer(-5).as_i64(), Some(-5));
        assert_eq!(Data::Long64Unsigned(u64::MAX).as_i64(), None);
        assert_eq!(Data::Float64(60.0).as_i64(), Some(60));
        assert_eq!(Data::Float64(60.5).as_i64(), None);
        assert_eq!(Data::Utf8String(" -120 ".to_string()).as_i64(), Some(-120));
        assert_eq!(Data::Utf8String("abc".to_string()).as_i64(), None);
        assert_eq!(Data::OctetString(vec![0x10, 0x00, 0x3C]).as_i64(), Some(60));
        assert_eq!(Data::OctetString(vec![0x10, 0x00]).as_i64(), None);
        assert_eq!(Data::Null.as_i64(), None);
        assert_eq!(Data::Structure(vec![]).as_i64(), None);
    }

    #[test]
    fn test_as_bool_conversions() {
        assert_eq!(Data::Bool(false).as_bool(), Some(false));
        assert_eq!(Data::Unsigned(2).as_bool(), Some(true));
        assert_eq!(Data::Utf8String("TRUE".to_string()).as_bool(), Some(true));
        assert_eq!(Data::VisibleString("0".to_string()).as_bool(), Some(false));
        assert_eq!(Data::VisibleString("maybe".to_string()).as_bool(), None);
        assert_eq!(Data::Null.as_bool(), None);
    }

    #[test]
    fn test_data_type_of_values() {
        assert_eq!(Data::Long(0).data_type(), DataType::Long);
        assert_eq!(Data::DateTime(DateTime::min_value()).data_type(), DataType::DateTime);
        assert_eq!(Data::Structure(vec![]).data_type(), DataType::Structure);
    }
}

use core::fmt::{self, Debug, Display};
use core::str::FromStr;

use nom::{IResult, Parser, number::complete::u8};
#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

use crate::data::DataType;
use crate::error::CosemError;

/// A logical name: the six-octet OBIS path identifying an object in a device.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObisCode {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub f: u8,
}

impl ObisCode {
    /// The logical name of the device clock, `0.0.1.0.0.255`.
    pub const CLOCK: ObisCode = ObisCode::new(0, 0, 1, 0, 0, 255);

    pub const fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, (a, b, c, d, e, f)) = (u8, u8, u8, u8, u8, u8).parse(input)?;
        Ok((input, Self::new(a, b, c, d, e, f)))
    }

    /// Builds a logical name from an octet-string value, which must be exactly six octets.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CosemError> {
        match *bytes {
            [a, b, c, d, e, f] => Ok(Self::new(a, b, c, d, e, f)),
            _ => Err(CosemError::Decode(DataType::OctetString)),
        }
    }

    pub const fn to_bytes(&self) -> [u8; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

impl Display for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}.{}.{}.{}", self.a, self.b, self.c, self.d, self.e, self.f)
    }
}

impl Debug for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ObisCode({})", self)
    }
}

/// Accepts the dotted form `0.0.1.0.0.255` and the reduced form `0-0:1.0.0*255`.
impl FromStr for ObisCode {
    type Err = CosemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut groups = [0u8; 6];
        let mut parts = s.trim().split(['.', '-', ':', '*']);
        for group in groups.iter_mut() {
            *group = parts
                .next()
                .and_then(|part| part.trim().parse().ok())
                .ok_or(CosemError::Decode(DataType::OctetString))?;
        }
        if parts.next().is_some() {
            return Err(CosemError::Decode(DataType::OctetString));
        }

        let [a, b, c, d, e, f] = groups;
        Ok(Self::new(a, b, c, d, e, f))
    }
}

#[cfg(feature = "serde")]
impl Serialize for ObisCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

//! COSEM `date-time` values.
//!
//! A COSEM date-time travels as twelve octets:
//!
//! ```text
//! year(2) month day day-of-week hour minute second hundredths deviation(2) status
//! ```
//!
//! Any single-octet field may be the wildcard `0xFF` (`0xFFFF` for the year),
//! the deviation may be `0x8000` ("not specified") and the status may be `0xFF`.
//! [`DateTime`] keeps the concrete calendar value in a [`chrono::NaiveDateTime`]
//! and remembers which fields arrived as wildcards so they are written back the
//! same way.

use alloc::vec::Vec;
use core::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use nom::{
    IResult, Parser,
    error::{Error, ErrorKind},
    number::complete::{be_i16, be_u16, u8},
};
#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

use crate::data::ByteBuffer;
use crate::error::{CosemError, Result};

/// Deviation value meaning "not specified".
pub const DEVIATION_NOT_SPECIFIED: i16 = 0x8000u16 as i16;

/// Largest year that still encodes (0xFFFF is the wildcard).
const MAX_YEAR: i32 = 0xFFFE;

/// Year substituted for a wildcard year. A leap year, so every month/day pair resolves.
const WILDCARD_YEAR: i32 = 2000;

/// Clock status octet carried by a date-time and by the Clock's status attribute.
///
/// The status is an open bit set: bits without a name are reserved but kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ClockStatus(u8);

impl ClockStatus {
    /// No bit set
    pub const OK: ClockStatus = ClockStatus(0x00);
    /// Bit 0: time could not be recovered after an incident
    #[rustfmt::skip]
    pub const INVALID_VALUE:   ClockStatus = ClockStatus(0b0000_0001);
    /// Bit 1: time could be recovered but the value cannot be guaranteed
    #[rustfmt::skip]
    pub const DOUBTFUL_VALUE:  ClockStatus = ClockStatus(0b0000_0010);
    /// Bit 2: time base differs from the one set in `clock_base`
    #[rustfmt::skip]
    pub const DIFFERENT_BASE:  ClockStatus = ClockStatus(0b0000_0100);
    /// Bit 3: this status octet is not valid
    #[rustfmt::skip]
    pub const INVALID_STATUS:  ClockStatus = ClockStatus(0b0000_1000);
    /// Bit 7: daylight saving is active
    #[rustfmt::skip]
    pub const DAYLIGHT_SAVING: ClockStatus = ClockStatus(0b1000_0000);

    const NAMED_BITS: u8 = 0b1000_1111;

    pub const fn from_bits(bits: u8) -> Self {
        ClockStatus(bits)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn contains(&self, other: ClockStatus) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn invalid_value(&self) -> bool {
        self.contains(Self::INVALID_VALUE)
    }

    pub fn doubtful_value(&self) -> bool {
        self.contains(Self::DOUBTFUL_VALUE)
    }

    pub fn different_base(&self) -> bool {
        self.contains(Self::DIFFERENT_BASE)
    }

    pub fn invalid_status(&self) -> bool {
        self.contains(Self::INVALID_STATUS)
    }

    pub fn daylight_saving(&self) -> bool {
        self.contains(Self::DAYLIGHT_SAVING)
    }

    /// Bits 4 to 6, which have no assigned meaning.
    pub const fn reserved_bits(&self) -> u8 {
        self.0 & !Self::NAMED_BITS
    }
}

impl core::ops::BitOr for ClockStatus {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        ClockStatus(self.0 | rhs.0)
    }
}

/// Fields of a date-time that were transmitted as wildcards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DateTimeSkip(u8);

impl DateTimeSkip {
    pub const NONE: DateTimeSkip = DateTimeSkip(0x00);
    pub const YEAR: DateTimeSkip = DateTimeSkip(0x01);
    pub const MONTH: DateTimeSkip = DateTimeSkip(0x02);
    pub const DAY: DateTimeSkip = DateTimeSkip(0x04);
    pub const DAY_OF_WEEK: DateTimeSkip = DateTimeSkip(0x08);
    pub const HOUR: DateTimeSkip = DateTimeSkip(0x10);
    pub const MINUTE: DateTimeSkip = DateTimeSkip(0x20);
    pub const SECOND: DateTimeSkip = DateTimeSkip(0x40);
    pub const HUNDREDTHS: DateTimeSkip = DateTimeSkip(0x80);

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn contains(&self, other: DateTimeSkip) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl core::ops::BitOr for DateTimeSkip {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        DateTimeSkip(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for DateTimeSkip {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A COSEM date-time with optional deviation and clock status.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    value: NaiveDateTime,
    deviation: Option<i16>,
    clock_status: Option<ClockStatus>,
    skip: DateTimeSkip,
}

impl DateTime {
    /// Encoded length in octets.
    pub const LEN: usize = 12;

    /// Creates a date-time without deviation or clock status.
    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        hundredth: u8,
    ) -> Result<Self> {
        let date = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
            .ok_or(CosemError::Decode(crate::DataType::DateTime))?;
        let time = NaiveTime::from_hms_milli_opt(
            u32::from(hour),
            u32::from(minute),
            u32::from(second),
            u32::from(hundredth) * 10,
        )
        .filter(|_| hundredth < 100)
        .ok_or(CosemError::Decode(crate::DataType::DateTime))?;
        Self::from_naive(date.and_time(time))
    }

    /// The minimum representable date-time, `0001-01-01T00:00:00.00`.
    ///
    /// Cleared date-time attributes are reset to this value.
    pub fn min_value() -> Self {
        // 0001-01-01 is always a valid date
        let date = NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or_default();
        Self {
            value: date.and_time(NaiveTime::MIN),
            deviation: None,
            clock_status: None,
            skip: DateTimeSkip::NONE,
        }
    }

    /// Wraps a chrono value, truncating it to hundredths of a second.
    pub fn from_naive(value: NaiveDateTime) -> Result<Self> {
        if !(0..=MAX_YEAR).contains(&value.year()) {
            return Err(CosemError::DateTimeOverflow);
        }
        let hundredths = (value.nanosecond() / 10_000_000).min(99);
        let value = value
            .with_nanosecond(hundredths * 10_000_000)
            .ok_or(CosemError::DateTimeOverflow)?;
        Ok(Self { value, deviation: None, clock_status: None, skip: DateTimeSkip::NONE })
    }

    pub fn with_deviation(mut self, deviation: Option<i16>) -> Self {
        self.deviation = deviation.filter(|&d| d != DEVIATION_NOT_SPECIFIED);
        self
    }

    pub fn with_clock_status(mut self, clock_status: Option<ClockStatus>) -> Self {
        self.clock_status = clock_status;
        self
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.value
    }

    pub fn year(&self) -> u16 {
        // from_naive keeps the year inside 0..=0xFFFE
        self.value.year() as u16
    }

    pub fn month(&self) -> u8 {
        self.value.month() as u8
    }

    pub fn day(&self) -> u8 {
        self.value.day() as u8
    }

    /// Day of week, 1 = Monday … 7 = Sunday.
    pub fn day_of_week(&self) -> u8 {
        self.value.weekday().number_from_monday() as u8
    }

    pub fn hour(&self) -> u8 {
        self.value.hour() as u8
    }

    pub fn minute(&self) -> u8 {
        self.value.minute() as u8
    }

    pub fn second(&self) -> u8 {
        self.value.second() as u8
    }

    pub fn hundredth(&self) -> u8 {
        (self.value.nanosecond() / 10_000_000) as u8
    }

    /// Minutes of local time to UTC, `None` when not specified.
    pub fn deviation(&self) -> Option<i16> {
        self.deviation
    }

    pub fn clock_status(&self) -> Option<ClockStatus> {
        self.clock_status
    }

    pub fn skip(&self) -> DateTimeSkip {
        self.skip
    }

    /// Returns a copy moved by `seconds`, with calendar rollover.
    ///
    /// The result is a concrete timestamp: wildcard markers are dropped while
    /// deviation and clock status are kept.
    pub fn checked_add_seconds(&self, seconds: i64) -> Result<Self> {
        let delta = TimeDelta::try_seconds(seconds).ok_or(CosemError::DateTimeOverflow)?;
        let value = self.value.checked_add_signed(delta).ok_or(CosemError::DateTimeOverflow)?;
        self.replace_naive(value)
    }

    /// Returns a copy holding `value`, keeping deviation and clock status.
    pub(crate) fn replace_naive(&self, value: NaiveDateTime) -> Result<Self> {
        Ok(Self::from_naive(value)?
            .with_deviation(self.deviation)
            .with_clock_status(self.clock_status))
    }

    /// Parses the twelve-octet form (without a data type tag).
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (rest, (year, month, day, day_of_week)) = (be_u16, u8, u8, u8).parse(input)?;
        let (rest, (hour, minute, second, hundredth)) = (u8, u8, u8, u8).parse(rest)?;
        let (rest, (deviation, status)) = (be_i16, u8).parse(rest)?;

        let mut skip = DateTimeSkip::NONE;
        let mut field = |raw: u8, wildcard: DateTimeSkip, default: u8| {
            if raw == 0xFF {
                skip |= wildcard;
                default
            } else {
                raw
            }
        };
        let month = field(month, DateTimeSkip::MONTH, 1);
        let day = field(day, DateTimeSkip::DAY, 1);
        field(day_of_week, DateTimeSkip::DAY_OF_WEEK, 0);
        let hour = field(hour, DateTimeSkip::HOUR, 0);
        let minute = field(minute, DateTimeSkip::MINUTE, 0);
        let second = field(second, DateTimeSkip::SECOND, 0);
        let hundredth = field(hundredth, DateTimeSkip::HUNDREDTHS, 0);
        let year = if year == 0xFFFF {
            skip |= DateTimeSkip::YEAR;
            WILDCARD_YEAR
        } else {
            i32::from(year)
        };

        let value = NaiveDate::from_ymd_opt(year, u32::from(month), u32::from(day))
            .zip(NaiveTime::from_hms_opt(u32::from(hour), u32::from(minute), u32::from(second)))
            .filter(|_| hundredth < 100)
            .map(|(date, time)| date.and_time(time))
            .and_then(|value| value.with_nanosecond(u32::from(hundredth) * 10_000_000));
        let Some(value) = value else {
            return Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)));
        };

        let date_time = Self {
            value,
            deviation: Some(deviation).filter(|&d| d != DEVIATION_NOT_SPECIFIED),
            clock_status: Some(status).filter(|&s| s != 0xFF).map(ClockStatus),
            skip,
        };
        Ok((rest, date_time))
    }

    /// Decodes exactly [`DateTime::LEN`] octets.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match Self::parse(bytes) {
            Ok((rest, date_time)) if rest.is_empty() => Ok(date_time),
            _ => Err(CosemError::Decode(crate::DataType::DateTime)),
        }
    }

    /// Encodes the twelve-octet form (without a data type tag).
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(Self::LEN);
        let field = |value: u8, wildcard: DateTimeSkip| {
            if self.skip.contains(wildcard) { 0xFF } else { value }
        };

        buffer.push_u16(if self.skip.contains(DateTimeSkip::YEAR) { 0xFFFF } else { self.year() });
        buffer.push(field(self.month(), DateTimeSkip::MONTH));
        buffer.push(field(self.day(), DateTimeSkip::DAY));
        buffer.push(field(self.day_of_week(), DateTimeSkip::DAY_OF_WEEK));
        buffer.push(field(self.hour(), DateTimeSkip::HOUR));
        buffer.push(field(self.minute(), DateTimeSkip::MINUTE));
        buffer.push(field(self.second(), DateTimeSkip::SECOND));
        buffer.push(field(self.hundredth(), DateTimeSkip::HUNDREDTHS));
        buffer.push_i16(self.deviation.unwrap_or(DEVIATION_NOT_SPECIFIED));
        buffer.push(self.clock_status.map_or(0xFF, |status| status.bits()));

        buffer
    }
}

impl Default for DateTime {
    fn default() -> Self {
        Self::min_value()
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:02}",
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second(),
            self.hundredth(),
        )?;

        // deviation is local time to UTC, so UTC+1 carries -60
        if let Some(deviation) = self.deviation {
            let sign = if deviation > 0 { '-' } else { '+' };
            let minutes = deviation.unsigned_abs();
            write!(f, "{}{:02}:{:02}", sign, minutes / 60, minutes % 60)?;
        }

        Ok(())
    }
}

impl fmt::Debug for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DateTime(\"{}\")", self)
    }
}

#[cfg(feature = "serde")]
impl Serialize for DateTime {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl TryFrom<NaiveDateTime> for DateTime {
    type Error = CosemError;

    fn try_from(value: NaiveDateTime) -> Result<Self> {
        Self::from_naive(value)
    }
}

impl From<DateTime> for NaiveDateTime {
    fn from(value: DateTime) -> Self {
        value.value
    }
}

#[cfg(feature = "jiff-conversions")]
impl TryFrom<&DateTime> for jiff::civil::DateTime {
    type Error = CosemError;

    fn try_from(value: &DateTime) -> Result<Self> {
        let year = i16::try_from(value.year()).map_err(|_| CosemError::DateTimeOverflow)?;
        jiff::civil::DateTime::new(
            year,
            value.month() as i8,
            value.day() as i8,
            value.hour() as i8,
            value.minute() as i8,
            value.second() as i8,
            i32::from(value.hundredth()) * 10_000_000,
        )
        .map_err(|_| CosemError::DateTimeOverflow)
    }
}

#[cfg(feature = "jiff-conversions")]
impl TryFrom<jiff::civil::DateTime> for DateTime {
    type Error = CosemError;

    fn try_from(value: jiff::civil::DateTime) -> Result<Self> {
        let year = u16::try_from(value.year()).map_err(|_| CosemError::DateTimeOverflow)?;
        DateTime::new(
            year,
            value.month() as u8,
            value.day() as u8,
            value.hour() as u8,
            value.minute() as u8,
            value.second() as u8,
            (value.subsec_nanosecond() / 10_000_000) as u8,
        )
    }
}

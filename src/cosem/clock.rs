//! Clock (COSEM interface class 8, version 0).
//!
//! # Attributes
//! 1. `logical_name` - octet-string(6)
//! 2. `time` - date-time
//! 3. `time_zone` - long, minutes; `0x8000` means not specified
//! 4. `status` - unsigned, [`ClockStatus`] bits
//! 5. `daylight_savings_begin` - date-time
//! 6. `daylight_savings_end` - date-time
//! 7. `daylight_savings_deviation` - integer, minutes
//! 8. `daylight_savings_enabled` - boolean
//! 9. `clock_base` - enum, see [`ClockBase`]
//!
//! # Methods
//! 1. `adjust_to_quarter` - round the time to the nearest quarter hour
//! 2. `adjust_to_measuring_period`
//! 3. `adjust_to_minute` - round the time to the nearest minute
//! 4. `adjust_to_preset_time`
//! 5. `preset_adjusting_time` - structure of preset time, window start and window end
//! 6. `shift_time` - long, seconds in `-900..=900`
//!
//! # Example
//! ```
//! use cosem_clock::cosem::CosemObject;
//! use cosem_clock::{Clock, Data, DateTime};
//!
//! let mut clock = Clock::default();
//! let now = DateTime::new(2024, 3, 1, 10, 22, 47, 50).unwrap();
//! clock.set_value(2, Data::DateTime(now)).unwrap();
//!
//! clock.invoke(1, None).unwrap();
//! assert_eq!(clock.time(), DateTime::new(2024, 3, 1, 10, 15, 0, 0).unwrap());
//! ```

use alloc::vec;
use alloc::vec::Vec;

use chrono::{NaiveDateTime, TimeDelta, Timelike};
use derive_try_from_primitive::TryFromPrimitive;
use log::{debug, trace, warn};

use crate::action::ActionRequestNormal;
use crate::cosem::{AttributeAccess, AttributeRegistry, CosemObject};
use crate::data::{Data, DataType};
use crate::date_time::{ClockStatus, DateTime};
use crate::error::{CosemError, Result as CosemResult};
use crate::obis_code::ObisCode;

/// Class id of the clock interface class.
pub const CLASS_ID: u16 = 8;
/// Version of the clock interface class.
pub const VERSION: u8 = 0;
/// Number of attributes, logical name included.
pub const ATTRIBUTE_COUNT: u8 = 9;
/// Number of methods.
pub const METHOD_COUNT: u8 = 6;

/// Largest shift accepted by `shift_time`, in seconds either way.
pub const MAX_SHIFT_SECONDS: i16 = 900;

/// Clock base (time reference source), attribute 9.
///
/// # Values
/// - 0: Not defined
/// - 1: Internal crystal
/// - 2: Mains frequency 50 Hz
/// - 3: Mains frequency 60 Hz
/// - 4: GPS
/// - 5: Radio controlled
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum ClockBase {
    /// Not defined / unknown
    NotDefined = 0,
    /// Internal crystal oscillator
    Crystal = 1,
    /// Mains frequency, 50 Hz
    Mains50Hz = 2,
    /// Mains frequency, 60 Hz
    Mains60Hz = 3,
    /// GPS receiver
    Gps = 4,
    /// Radio controlled (DCF77, MSF, WWVB, ...)
    Radio = 5,
}

/// Method indexes of the clock class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ClockMethod {
    /// Method 1, round to the nearest quarter hour
    AdjustToQuarter = 1,
    /// Method 2
    AdjustToMeasuringPeriod = 2,
    /// Method 3, round to the nearest minute
    AdjustToMinute = 3,
    /// Method 4
    AdjustToPresetTime = 4,
    /// Method 5, preset time with its validity window
    PresetAdjustingTime = 5,
    /// Method 6, shift by a signed number of seconds
    ShiftTime = 6,
}

/// Clock interface class (class id 8, version 0).
///
/// Fields change only through [`CosemObject::set_value`] and
/// [`CosemObject::invoke`]; a rejected call leaves every field untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Clock {
    /// Logical name (OBIS code) - Attribute 1.
    /// `None` until read from the device.
    logical_name: Option<ObisCode>,

    /// Short name base address, for short-name referencing.
    /// Not a COSEM attribute.
    short_name: Option<u16>,

    /// Current date and time - Attribute 2
    time: DateTime,

    /// Minutes from local time to UTC - Attribute 3.
    /// `i16::MIN` (`0x8000`) means not specified.
    time_zone: i16,

    /// Clock status bits - Attribute 4
    status: ClockStatus,

    /// Daylight saving start - Attribute 5
    begin: DateTime,

    /// Daylight saving end - Attribute 6
    end: DateTime,

    /// Daylight saving shift in minutes - Attribute 7
    deviation: i8,

    /// Daylight saving enabled flag - Attribute 8
    enabled: bool,

    /// Raw clock base - Attribute 9.
    /// Kept as received so unknown values survive a round trip.
    clock_base: u8,

    #[cfg_attr(feature = "serde", serde(skip))]
    attributes: AttributeRegistry,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(ObisCode::CLOCK)
    }
}

impl Clock {
    /// Creates a clock with default values.
    ///
    /// # Arguments
    /// * `logical_name` - OBIS code of the clock object (usually `0.0.1.0.0.255`)
    ///
    /// # Returns
    /// A clock at `0001-01-01 00:00:00`, time zone 0, status OK, daylight
    /// saving disabled and clock base not defined.
    pub fn new(logical_name: ObisCode) -> Self {
        Self::with_logical_name(Some(logical_name))
    }

    /// Creates a clock addressed by both logical name and short name.
    ///
    /// # Arguments
    /// * `logical_name` - OBIS code of the clock object
    /// * `short_name` - base address used with short-name referencing
    pub fn with_short_name(logical_name: ObisCode, short_name: u16) -> Self {
        let mut clock = Self::new(logical_name);
        clock.short_name = Some(short_name);
        clock
    }

    /// A clock whose logical name is still to be read from the device.
    pub fn unidentified() -> Self {
        Self::with_logical_name(None)
    }

    fn with_logical_name(logical_name: Option<ObisCode>) -> Self {
        let mut clock = Self {
            logical_name,
            short_name: None,
            time: DateTime::min_value(),
            time_zone: 0,
            status: ClockStatus::OK,
            begin: DateTime::min_value(),
            end: DateTime::min_value(),
            deviation: 0,
            enabled: false,
            clock_base: ClockBase::NotDefined as u8,
            attributes: AttributeRegistry::new(),
        };
        clock.update_default_value_items();
        clock
    }

    /// Registers the class defaults: `time` is typed as date-time and
    /// `status` is read-only. Safe to call again.
    pub fn update_default_value_items(&mut self) {
        self.attributes.set_data_type(2, DataType::DateTime);
        self.attributes.ensure(4, "Status", AttributeAccess::READ_ONLY);
    }

    /// Short name base address, if the clock was created with one.
    pub fn short_name(&self) -> Option<u16> {
        self.short_name
    }

    /// Current time (attribute 2).
    pub fn time(&self) -> DateTime {
        self.time
    }

    /// Minutes from local time to UTC (attribute 3).
    ///
    /// # Returns
    /// The offset in minutes, or `i16::MIN` when the device reports it as not specified.
    pub fn time_zone(&self) -> i16 {
        self.time_zone
    }

    /// Clock status bits (attribute 4).
    pub fn status(&self) -> ClockStatus {
        self.status
    }

    /// Daylight saving start (attribute 5).
    pub fn daylight_savings_begin(&self) -> DateTime {
        self.begin
    }

    /// Daylight saving end (attribute 6).
    pub fn daylight_savings_end(&self) -> DateTime {
        self.end
    }

    /// Daylight saving shift in minutes (attribute 7).
    pub fn daylight_savings_deviation(&self) -> i8 {
        self.deviation
    }

    /// Whether daylight saving is applied (attribute 8).
    pub fn daylight_savings_enabled(&self) -> bool {
        self.enabled
    }

    /// Clock base (attribute 9).
    ///
    /// # Returns
    /// `None` when the device reports a base outside the known table; the raw
    /// value is still available from [`Clock::raw_clock_base`].
    pub fn clock_base(&self) -> Option<ClockBase> {
        ClockBase::try_from(self.clock_base).ok()
    }

    /// Clock base exactly as received.
    pub fn raw_clock_base(&self) -> u8 {
        self.clock_base
    }

    /// Values of attributes 1 to 9, in index order.
    ///
    /// Each entry equals `self.value(index)` for the matching index.
    pub fn values(&self) -> Vec<Data> {
        (1..=ATTRIBUTE_COUNT).filter_map(|index| self.value(index).ok()).collect()
    }

    /// Method 1: rounds the time to the nearest quarter hour.
    ///
    /// Minutes 0..=7 go to :00, 8..=22 to :15, 23..=37 to :30, 38..=52 to :45
    /// and 53..=59 to :00 of the next hour. Seconds and hundredths are cleared.
    ///
    /// # Errors
    /// `DateTimeOverflow` when rounding up would leave year 65534, i.e. from
    /// `65534-12-31 23:53`. The time is left unchanged.
    pub fn adjust_to_quarter(&mut self) -> CosemResult<()> {
        let current = self.time.naive();
        let quarter = match current.minute() {
            0..=7 => 0,
            8..=22 => 15,
            23..=37 => 30,
            38..=52 => 45,
            _ => 60,
        };
        let adjusted = start_of_hour(current)
            .zip(TimeDelta::try_minutes(quarter))
            .and_then(|(hour, delta)| hour.checked_add_signed(delta))
            .ok_or(CosemError::DateTimeOverflow)?;
        self.time = self.time.replace_naive(adjusted)?;
        Ok(())
    }

    /// Method 2. The measuring period lives outside this object, so nothing changes here.
    pub fn adjust_to_measuring_period(&mut self) -> CosemResult<()> {
        Ok(())
    }

    /// Method 3: rounds the time to the nearest minute. More than 30 seconds
    /// rounds up.
    ///
    /// # Errors
    /// `DateTimeOverflow` when rounding up would leave year 65534, i.e. after
    /// `65534-12-31 23:59:30`. The time is left unchanged.
    pub fn adjust_to_minute(&mut self) -> CosemResult<()> {
        let current = self.time.naive();
        let minute = current
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .ok_or(CosemError::DateTimeOverflow)?;
        let adjusted = if current.second() > 30 {
            TimeDelta::try_minutes(1)
                .and_then(|delta| minute.checked_add_signed(delta))
                .ok_or(CosemError::DateTimeOverflow)?
        } else {
            minute
        };
        self.time = self.time.replace_naive(adjusted)?;
        Ok(())
    }

    /// Method 4. The preset is applied by the device, so nothing changes here.
    pub fn adjust_to_preset_time(&mut self) -> CosemResult<()> {
        Ok(())
    }

    /// Method 5: sets the time to `preset`.
    ///
    /// The validity window is taken as given; whether the current time lies
    /// inside it is the caller's precondition.
    ///
    /// # Arguments
    /// * `preset` - the new time
    /// * `window_start` - start of the validity window
    /// * `window_end` - end of the validity window
    pub fn preset_adjusting_time(
        &mut self,
        preset: DateTime,
        window_start: DateTime,
        window_end: DateTime,
    ) -> CosemResult<()> {
        debug!("Clock preset to {} (window {} .. {})", preset, window_start, window_end);
        self.time = preset;
        Ok(())
    }

    /// Method 6: moves the time by `seconds`, which must lie in `-900..=900`.
    ///
    /// # Example
    /// - Current: 14:30:00, shift: 90 → 14:31:30
    /// - Current: 23:59:30, shift: 45 → 00:00:15 of the next day
    ///
    /// # Errors
    /// `OutOfRange` for a larger shift, `DateTimeOverflow` when the result
    /// leaves the encodable years. The time is left unchanged in both cases.
    pub fn shift_time(&mut self, seconds: i16) -> CosemResult<()> {
        check_shift(i64::from(seconds))?;
        self.time = self.time.checked_add_seconds(i64::from(seconds))?;
        Ok(())
    }

    /// Builds the request invoking method 1 on the device.
    ///
    /// # Arguments
    /// * `invoke_id` - invoke-id-and-priority octet of the request
    ///
    /// # Returns
    /// An ACTION request carrying `integer(0)` as parameter.
    ///
    /// # Errors
    /// `MissingLogicalName` when the clock has no logical name yet.
    pub fn adjust_to_quarter_request(&self, invoke_id: u8) -> CosemResult<ActionRequestNormal> {
        self.action_request(invoke_id, ClockMethod::AdjustToQuarter, Data::Integer(0))
    }

    /// Builds the request invoking method 2. See [`Clock::adjust_to_quarter_request`].
    pub fn adjust_to_measuring_period_request(&self, invoke_id: u8) -> CosemResult<ActionRequestNormal> {
        self.action_request(invoke_id, ClockMethod::AdjustToMeasuringPeriod, Data::Integer(0))
    }

    /// Builds the request invoking method 3. See [`Clock::adjust_to_quarter_request`].
    pub fn adjust_to_minute_request(&self, invoke_id: u8) -> CosemResult<ActionRequestNormal> {
        self.action_request(invoke_id, ClockMethod::AdjustToMinute, Data::Integer(0))
    }

    /// Builds the request invoking method 4. See [`Clock::adjust_to_quarter_request`].
    pub fn adjust_to_preset_time_request(&self, invoke_id: u8) -> CosemResult<ActionRequestNormal> {
        self.action_request(invoke_id, ClockMethod::AdjustToPresetTime, Data::Integer(0))
    }

    /// Builds the request invoking method 5. The three date-times travel as
    /// octet-strings inside one structure.
    ///
    /// # Errors
    /// `MissingLogicalName` when the clock has no logical name yet.
    pub fn preset_adjusting_time_request(
        &self,
        invoke_id: u8,
        preset: &DateTime,
        window_start: &DateTime,
        window_end: &DateTime,
    ) -> CosemResult<ActionRequestNormal> {
        let parameters = Data::Structure(vec![
            Data::OctetString(preset.encode()),
            Data::OctetString(window_start.encode()),
            Data::OctetString(window_end.encode()),
        ]);
        self.action_request(invoke_id, ClockMethod::PresetAdjustingTime, parameters)
    }

    /// Builds the request invoking method 6, rejecting shifts outside `-900..=900`.
    ///
    /// # Arguments
    /// * `invoke_id` - invoke-id-and-priority octet of the request
    /// * `seconds` - signed shift, sent as `long`
    ///
    /// # Errors
    /// `OutOfRange` for a larger shift, `MissingLogicalName` when the clock
    /// has no logical name yet.
    pub fn shift_time_request(&self, invoke_id: u8, seconds: i16) -> CosemResult<ActionRequestNormal> {
        check_shift(i64::from(seconds))?;
        self.action_request(invoke_id, ClockMethod::ShiftTime, Data::Long(seconds))
    }

    fn action_request(
        &self,
        invoke_id: u8,
        method: ClockMethod,
        parameters: Data,
    ) -> CosemResult<ActionRequestNormal> {
        let instance_id = self.logical_name.ok_or(CosemError::MissingLogicalName)?;
        Ok(ActionRequestNormal {
            invoke_id,
            class_id: CLASS_ID,
            instance_id,
            method_id: method as u8,
            method_invocation_parameters: Some(parameters),
        })
    }

    fn dispatch(&mut self, method: ClockMethod, parameters: Option<Data>) -> CosemResult<()> {
        match method {
            ClockMethod::AdjustToQuarter => self.adjust_to_quarter(),
            ClockMethod::AdjustToMeasuringPeriod => self.adjust_to_measuring_period(),
            ClockMethod::AdjustToMinute => self.adjust_to_minute(),
            ClockMethod::AdjustToPresetTime => self.adjust_to_preset_time(),
            ClockMethod::PresetAdjustingTime => {
                let [preset, window_start, window_end] = preset_arguments(parameters)?;
                self.preset_adjusting_time(preset, window_start, window_end)
            }
            ClockMethod::ShiftTime => {
                let seconds = parameters
                    .as_ref()
                    .ok_or(CosemError::TypeCoercion { expected: DataType::Long, found: None })
                    .and_then(|value| integer(value, DataType::Long))?;
                check_shift(seconds)?;
                // check_shift keeps the value inside i16
                self.shift_time(seconds as i16)
            }
        }
    }
}

impl CosemObject for Clock {
    fn class_id(&self) -> u16 {
        CLASS_ID
    }

    fn version(&self) -> u8 {
        VERSION
    }

    fn logical_name(&self) -> Option<ObisCode> {
        self.logical_name
    }

    fn attribute_count(&self) -> u8 {
        ATTRIBUTE_COUNT
    }

    fn method_count(&self) -> u8 {
        METHOD_COUNT
    }

    fn attributes(&self) -> &AttributeRegistry {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut AttributeRegistry {
        &mut self.attributes
    }

    fn attribute_indexes_to_read(&self) -> Vec<u8> {
        let mut indexes = Vec::new();
        if self.logical_name.is_none() {
            indexes.push(1);
        }
        for index in 2..=ATTRIBUTE_COUNT {
            let needed = match index {
                // time and status change on their own
                2 | 4 => self.attributes.can_read(index),
                _ => !self.attributes.is_read(index),
            };
            if needed {
                indexes.push(index);
            }
        }
        indexes
    }

    fn attribute_data_type(&self, index: u8) -> CosemResult<DataType> {
        let fixed = match index {
            1 => DataType::OctetString,
            2 => return Ok(DataType::DateTime),
            3 => DataType::Long,
            4 => DataType::Unsigned,
            5 | 6 => DataType::DateTime,
            7 => DataType::Integer,
            8 => DataType::Bool,
            9 => DataType::Enum,
            _ => return Err(CosemError::InvalidAttributeIndex(index)),
        };
        Ok(self.attributes.data_type(index).unwrap_or(fixed))
    }

    fn value(&self, index: u8) -> CosemResult<Data> {
        let value = match index {
            1 => Data::OctetString(self.logical_name.map_or_else(Vec::new, |ln| ln.to_bytes().to_vec())),
            2 => Data::DateTime(self.time),
            3 => Data::Long(self.time_zone),
            4 => Data::Unsigned(self.status.bits()),
            5 => Data::DateTime(self.begin),
            6 => Data::DateTime(self.end),
            7 => Data::Integer(self.deviation),
            8 => Data::Bool(self.enabled),
            9 => Data::Enum(self.clock_base),
            _ => return Err(CosemError::InvalidAttributeIndex(index)),
        };
        trace!("Clock attribute {} = {:?}", index, value);
        Ok(value)
    }

    fn set_value(&mut self, index: u8, value: Data) -> CosemResult<()> {
        let result = match index {
            1 => logical_name(&value).map(|ln| self.logical_name = Some(ln)),
            2 => date_time(value).map(|dt| self.time = dt),
            3 => time_zone(&value).map(|tz| self.time_zone = tz),
            4 => status(&value).map(|bits| self.status = ClockStatus::from_bits(bits)),
            5 => date_time(value).map(|dt| self.begin = dt),
            6 => date_time(value).map(|dt| self.end = dt),
            7 => bounded::<i8>(&value, DataType::Integer).map(|d| self.deviation = d),
            8 => value
                .as_bool()
                .ok_or_else(|| coercion(DataType::Bool, &value))
                .map(|enabled| self.enabled = enabled),
            9 => bounded::<u8>(&value, DataType::Enum).map(|base| self.clock_base = base),
            _ => Err(CosemError::InvalidAttributeIndex(index)),
        };

        match &result {
            Ok(()) => debug!("Clock attribute {} updated", index),
            Err(err) => warn!("Clock attribute {} rejected: {}", index, err),
        }
        result
    }

    fn invoke(&mut self, method: u8, parameters: Option<Data>) -> CosemResult<()> {
        let result = ClockMethod::try_from(method)
            .map_err(|_| CosemError::InvalidMethodIndex(method))
            .and_then(|m| self.dispatch(m, parameters));

        match &result {
            Ok(()) => debug!("Clock method {} done, time {}", method, self.time),
            Err(err) => warn!("Clock method {} rejected: {}", method, err),
        }
        result
    }
}

fn start_of_hour(value: NaiveDateTime) -> Option<NaiveDateTime> {
    value.with_minute(0)?.with_second(0)?.with_nanosecond(0)
}

fn check_shift(seconds: i64) -> CosemResult<()> {
    let limit = i64::from(MAX_SHIFT_SECONDS);
    if (-limit..=limit).contains(&seconds) {
        Ok(())
    } else {
        Err(CosemError::OutOfRange { value: seconds, min: -limit, max: limit })
    }
}

fn coercion(expected: DataType, found: &Data) -> CosemError {
    let found = match found {
        Data::Null => None,
        other => Some(other.data_type()),
    };
    CosemError::TypeCoercion { expected, found }
}

fn integer(value: &Data, expected: DataType) -> CosemResult<i64> {
    value.as_i64().ok_or_else(|| coercion(expected, value))
}

fn bounded<T: TryFrom<i64>>(value: &Data, expected: DataType) -> CosemResult<T> {
    T::try_from(integer(value, expected)?).map_err(|_| coercion(expected, value))
}

/// `0x8000` ("not specified") is accepted however it arrives; any other
/// value has to fit a signed long.
fn time_zone(value: &Data) -> CosemResult<i16> {
    match integer(value, DataType::Long)? {
        0x8000 => Ok(i16::MIN),
        minutes => i16::try_from(minutes).map_err(|_| coercion(DataType::Long, value)),
    }
}

/// Status accepts signed and unsigned octets; the bit pattern is kept.
fn status(value: &Data) -> CosemResult<u8> {
    let bits = integer(value, DataType::Unsigned)?;
    if (i64::from(i8::MIN)..=i64::from(u8::MAX)).contains(&bits) {
        Ok(bits as u8)
    } else {
        Err(coercion(DataType::Unsigned, value))
    }
}

fn date_time(value: Data) -> CosemResult<DateTime> {
    match value {
        Data::Null => Ok(DateTime::min_value()),
        Data::DateTime(dt) => Ok(dt),
        Data::OctetString(bytes) => DateTime::from_bytes(&bytes),
        other => Err(coercion(DataType::DateTime, &other)),
    }
}

fn logical_name(value: &Data) -> CosemResult<ObisCode> {
    match value {
        Data::OctetString(bytes) => ObisCode::from_bytes(bytes),
        Data::VisibleString(text) | Data::Utf8String(text) => text.parse(),
        other => Err(coercion(DataType::OctetString, other)),
    }
}

/// Decodes the preset time and its window. Nothing is returned unless all three decode.
fn preset_arguments(parameters: Option<Data>) -> CosemResult<[DateTime; 3]> {
    let malformed = CosemError::Decode(DataType::DateTime);
    let Some(Data::Structure(items)) = parameters else {
        return Err(malformed);
    };
    let [preset, window_start, window_end] = <[Data; 3]>::try_from(items).map_err(|_| malformed.clone())?;

    let decode = |item: Data| match item {
        Data::DateTime(dt) => Ok(dt),
        Data::OctetString(bytes) => DateTime::from_bytes(&bytes),
        _ => Err(malformed.clone()),
    };
    Ok([decode(preset)?, decode(window_start)?, decode(window_end)?])
}

//! COSEM object model.
//!
//! A COSEM object exposes numbered attributes and methods. Attribute 1 is
//! always the logical name; the rest are defined by the interface class.
//! Alongside its values every object keeps an [`AttributeRegistry`] with the
//! per-attribute bookkeeping a client needs: access rights, an optional wire
//! type override and whether the value has already been read.
//!
//! # Example
//!
//! ```
//! use cosem_clock::cosem::CosemObject;
//! use cosem_clock::{Clock, Data};
//!
//! let mut clock = Clock::default();
//! assert_eq!(clock.attribute_indexes_to_read(), vec![2, 3, 4, 5, 6, 7, 8, 9]);
//!
//! clock.receive(3, Data::Long(-60)).unwrap();
//! assert_eq!(clock.value(3).unwrap(), Data::Long(-60));
//! assert!(!clock.attribute_indexes_to_read().contains(&3));
//! ```

use alloc::vec::Vec;

use log::{debug, warn};

use crate::action::{ActionRequestNormal, ActionResponseNormal, ActionResult};
use crate::data::{Data, DataType};
use crate::error::Result;
use crate::obis_code::ObisCode;

pub mod clock;

/// Attribute and method dispatch shared by all COSEM interface classes.
///
/// Every failing call returns before touching the object, so an `Err` always
/// leaves the previous state in place.
pub trait CosemObject {
    /// COSEM interface class ID (8 for the clock).
    fn class_id(&self) -> u16;

    /// Version of the interface class.
    fn version(&self) -> u8;

    /// The logical name, or `None` until it has been set or read.
    fn logical_name(&self) -> Option<ObisCode>;

    /// Number of attributes, logical name included.
    fn attribute_count(&self) -> u8;

    /// Number of methods.
    fn method_count(&self) -> u8;

    /// Per-attribute bookkeeping (access, type override, read mark).
    fn attributes(&self) -> &AttributeRegistry;

    fn attributes_mut(&mut self) -> &mut AttributeRegistry;

    /// Attribute indexes that still have to be fetched, ascending and without duplicates.
    fn attribute_indexes_to_read(&self) -> Vec<u8>;

    /// Wire type of attribute `index`.
    ///
    /// # Errors
    /// `InvalidAttributeIndex` outside `1..=attribute_count()`.
    fn attribute_data_type(&self, index: u8) -> Result<DataType>;

    /// Projects attribute `index` to a typed value. The value carries its wire type.
    ///
    /// # Errors
    /// `InvalidAttributeIndex` outside `1..=attribute_count()`.
    fn value(&self, index: u8) -> Result<Data>;

    /// Coerces `value` into attribute `index`.
    ///
    /// # Arguments
    /// * `index` - attribute index, starting at 1
    /// * `value` - the typed value, or the raw tagged encoding as an octet-string
    ///
    /// # Errors
    /// `InvalidAttributeIndex`, or a coercion/decode error when `value`
    /// does not fit the attribute. Nothing is stored on error.
    fn set_value(&mut self, index: u8, value: Data) -> Result<()>;

    /// Runs method `method` with its optional invocation parameters.
    ///
    /// # Errors
    /// `InvalidMethodIndex` outside `1..=method_count()`, otherwise whatever
    /// the method itself rejects.
    fn invoke(&mut self, method: u8, parameters: Option<Data>) -> Result<()>;

    /// Stores a value fetched from the device and marks the attribute as read.
    fn receive(&mut self, index: u8, value: Data) -> Result<()> {
        self.set_value(index, value)?;
        self.attributes_mut().mark_read(index);
        Ok(())
    }
}

/// Serves an ACTION-Request-Normal against `object`.
///
/// Requests addressed to another class or logical name are answered without
/// invoking anything.
///
/// # Returns
/// A response echoing the request's invoke id. Errors of the object are
/// mapped to their [`ActionResult`] code.
pub fn handle_action(
    object: &mut dyn CosemObject,
    request: &ActionRequestNormal,
) -> ActionResponseNormal {
    let result = if request.class_id != object.class_id() {
        ActionResult::ObjectClassInconsistent
    } else if object.logical_name() != Some(request.instance_id) {
        ActionResult::ObjectUndefined
    } else {
        match object.invoke(request.method_id, request.method_invocation_parameters.clone()) {
            Ok(()) => ActionResult::Success,
            Err(err) => ActionResult::from(&err),
        }
    };

    if result == ActionResult::Success {
        debug!("Action {}/{} served", request.instance_id, request.method_id);
    } else {
        warn!("Action {}/{} answered {:?}", request.instance_id, request.method_id, result);
    }

    ActionResponseNormal {
        invoke_id: request.invoke_id,
        result,
    }
}

/// Access rights for COSEM attributes.
///
/// ```
/// use cosem_clock::cosem::AttributeAccess;
///
/// let rw = AttributeAccess::READ_WRITE;
/// assert!(rw.contains(AttributeAccess::READ_ONLY));
/// assert!(rw.contains(AttributeAccess::WRITE_ONLY));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AttributeAccess(u8);

impl AttributeAccess {
    /// No access
    pub const NO_ACCESS: AttributeAccess = AttributeAccess(0x00);
    /// Read access
    pub const READ_ONLY: AttributeAccess = AttributeAccess(0x01);
    /// Write access
    pub const WRITE_ONLY: AttributeAccess = AttributeAccess(0x02);
    /// Read and write access
    pub const READ_WRITE: AttributeAccess = AttributeAccess(0x03);
    /// Read access after authentication
    pub const AUTHENTICATED_READ: AttributeAccess = AttributeAccess(0x04);
    /// Write access after authentication
    pub const AUTHENTICATED_WRITE: AttributeAccess = AttributeAccess(0x08);

    pub const fn from_bits(bits: u8) -> Self {
        AttributeAccess(bits)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// True if every bit of `other` is set.
    pub const fn contains(&self, other: AttributeAccess) -> bool {
        (self.0 & other.0) == other.0
    }

    /// True if any bit of `other` is set.
    pub const fn intersects(&self, other: AttributeAccess) -> bool {
        (self.0 & other.0) != 0
    }

    pub const fn is_no_access(&self) -> bool {
        self.0 == 0
    }

    /// Plain or authenticated read.
    pub const fn is_readable(&self) -> bool {
        self.intersects(AttributeAccess(Self::READ_ONLY.0 | Self::AUTHENTICATED_READ.0))
    }

    /// Plain or authenticated write.
    pub const fn is_writable(&self) -> bool {
        self.intersects(AttributeAccess(Self::WRITE_ONLY.0 | Self::AUTHENTICATED_WRITE.0))
    }
}

impl Default for AttributeAccess {
    fn default() -> Self {
        Self::READ_WRITE
    }
}

impl core::ops::BitOr for AttributeAccess {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        AttributeAccess(self.0 | rhs.0)
    }
}

impl core::ops::BitAnd for AttributeAccess {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        AttributeAccess(self.0 & rhs.0)
    }
}

/// Bookkeeping for one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AttributeSettings {
    /// Attribute index, starting at 1
    pub index: u8,
    /// Display name, empty when created implicitly
    pub name: &'static str,
    /// Access rights
    pub access: AttributeAccess,
    /// Overrides the class's static wire type when set.
    pub data_type: Option<DataType>,
    /// Whether the value has been fetched in the current cycle
    pub read: bool,
}

impl AttributeSettings {
    pub fn new(index: u8, name: &'static str, access: AttributeAccess) -> Self {
        Self {
            index,
            name,
            access,
            data_type: None,
            read: false,
        }
    }
}

/// Attribute descriptors keyed by index.
///
/// Attributes without a descriptor are read-write, have no type override and
/// are not read yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AttributeRegistry {
    settings: Vec<AttributeSettings>,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeSettings> {
        self.settings.iter()
    }

    /// Descriptor of attribute `index`, if one was registered.
    pub fn find(&self, index: u8) -> Option<&AttributeSettings> {
        self.position(index).ok().map(|at| &self.settings[at])
    }

    /// Returns the descriptor for `index`, creating it with `name` and
    /// `access` if it does not exist. An existing descriptor is left as is.
    pub fn ensure(
        &mut self,
        index: u8,
        name: &'static str,
        access: AttributeAccess,
    ) -> &mut AttributeSettings {
        let at = match self.position(index) {
            Ok(at) => at,
            Err(at) => {
                self.settings.insert(at, AttributeSettings::new(index, name, access));
                at
            }
        };
        &mut self.settings[at]
    }

    /// Access rights of `index`; read-write when there is no descriptor.
    pub fn access(&self, index: u8) -> AttributeAccess {
        self.find(index).map_or(AttributeAccess::default(), |s| s.access)
    }

    pub fn can_read(&self, index: u8) -> bool {
        self.access(index).is_readable()
    }

    pub fn can_write(&self, index: u8) -> bool {
        self.access(index).is_writable()
    }

    /// Whether `index` was fetched since the last [`AttributeRegistry::reset_read`].
    pub fn is_read(&self, index: u8) -> bool {
        self.find(index).is_some_and(|s| s.read)
    }

    /// Marks `index` as fetched, creating a read-write descriptor if needed.
    pub fn mark_read(&mut self, index: u8) {
        self.ensure(index, "", AttributeAccess::default()).read = true;
    }

    /// Forgets every read mark so the next cycle fetches everything again.
    pub fn reset_read(&mut self) {
        for settings in &mut self.settings {
            settings.read = false;
        }
    }

    pub fn data_type(&self, index: u8) -> Option<DataType> {
        self.find(index).and_then(|s| s.data_type)
    }

    /// Overrides the wire type of `index`.
    ///
    /// # Arguments
    /// * `index` - attribute index
    /// * `data_type` - type reported by `attribute_data_type` from now on
    pub fn set_data_type(&mut self, index: u8, data_type: DataType) {
        self.ensure(index, "", AttributeAccess::default()).data_type = Some(data_type);
    }

    fn position(&self, index: u8) -> core::result::Result<usize, usize> {
        self.settings.binary_search_by_key(&index, |s| s.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Clock;

    #[test]
    fn test_attribute_access_flags() {
        assert!(AttributeAccess::READ_WRITE.contains(AttributeAccess::READ_ONLY));
        assert!(AttributeAccess::READ_WRITE.contains(AttributeAccess::WRITE_ONLY));
        assert!(!AttributeAccess::READ_ONLY.contains(AttributeAccess::WRITE_ONLY));
        assert!(AttributeAccess::NO_ACCESS.is_no_access());
        assert_eq!(
            AttributeAccess::READ_ONLY | AttributeAccess::WRITE_ONLY,
            AttributeAccess::READ_WRITE
        );
        assert_eq!(
            AttributeAccess::READ_WRITE & AttributeAccess::WRITE_ONLY,
            AttributeAccess::WRITE_ONLY
        );
    }

    #[test]
    fn test_attribute_access_readable_writable() {
        assert!(AttributeAccess::READ_ONLY.is_readable());
        assert!(AttributeAccess::AUTHENTICATED_READ.is_readable());
        assert!(!AttributeAccess::WRITE_ONLY.is_readable());
        assert!(!AttributeAccess::NO_ACCESS.is_readable());
        assert!(AttributeAccess::AUTHENTICATED_WRITE.is_writable());
        assert!(!AttributeAccess::READ_ONLY.is_writable());
    }

    #[test]
    fn test_registry_defaults_for_unknown_attributes() {
        let registry = AttributeRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.can_read(5));
        assert!(registry.can_write(5));
        assert!(!registry.is_read(5));
        assert_eq!(registry.data_type(5), None);
    }

    #[test]
    fn test_registry_ensure_is_idempotent() {
        let mut registry = AttributeRegistry::new();
        registry.ensure(4, "Status", AttributeAccess::READ_ONLY);
        registry.ensure(4, "Other", AttributeAccess::READ_WRITE);

        assert_eq!(registry.len(), 1);
        let status = registry.find(4).unwrap();
        assert_eq!(status.name, "Status");
        assert_eq!(status.access, AttributeAccess::READ_ONLY);
        assert!(!registry.can_write(4));
    }

    #[test]
    fn test_registry_keeps_index_order() {
        let mut registry = AttributeRegistry::new();
        registry.mark_read(7);
        registry.set_data_type(2, DataType::DateTime);
        registry.ensure(4, "Status", AttributeAccess::READ_ONLY);

        let indexes: Vec<u8> = registry.iter().map(|s| s.index).collect();
        assert_eq!(indexes, alloc::vec![2, 4, 7]);
    }

    #[test]
    fn test_registry_read_marks() {
        let mut registry = AttributeRegistry::new();
        registry.ensure(3, "TimeZone", AttributeAccess::READ_WRITE);
        registry.mark_read(3);
        registry.mark_read(8);

        assert!(registry.is_read(3));
        assert!(registry.is_read(8));
        assert_eq!(registry.find(3).unwrap().name, "TimeZone");

        registry.reset_read();
        assert!(!registry.is_read(3));
        assert!(!registry.is_read(8));
    }

    #[test]
    fn test_registry_data_type_override() {
        let mut registry = AttributeRegistry::new();
        registry.set_data_type(3, DataType::DoubleLong);
        assert_eq!(registry.data_type(3), Some(DataType::DoubleLong));
        assert!(!registry.is_read(3));
    }

    #[test]
    fn test_receive_marks_read_only_on_success() {
        let mut clock = Clock::default();

        assert!(clock.receive(7, Data::Structure(alloc::vec![])).is_err());
        assert!(!clock.attributes().is_read(7));

        clock.receive(7, Data::Integer(-5)).unwrap();
        assert!(clock.attributes().is_read(7));
        assert_eq!(clock.value(7).unwrap(), Data::Integer(-5));
    }

    #[test]
    fn test_handle_action_success() {
        let mut clock = Clock::default();
        let request = ActionRequestNormal {
            invoke_id: 0x41,
            class_id: 8,
            instance_id: ObisCode::CLOCK,
            method_id: 2,
            method_invocation_parameters: Some(Data::Integer(0)),
        };

        let response = handle_action(&mut clock, &request);
        assert_eq!(response.invoke_id, 0x41);
        assert_eq!(response.result, ActionResult::Success);
    }

    #[test]
    fn test_handle_action_rejections() {
        let mut clock = Clock::default();
        let mut request = ActionRequestNormal {
            invoke_id: 1,
            class_id: 3,
            instance_id: ObisCode::CLOCK,
            method_id: 1,
            method_invocation_parameters: None,
        };
        assert_eq!(
            handle_action(&mut clock, &request).result,
            ActionResult::ObjectClassInconsistent
        );

        request.class_id = 8;
        request.instance_id = ObisCode::new(1, 0, 1, 8, 0, 255);
        assert_eq!(handle_action(&mut clock, &request).result, ActionResult::ObjectUndefined);

        request.instance_id = ObisCode::CLOCK;
        request.method_id = 7;
        assert_eq!(handle_action(&mut clock, &request).result, ActionResult::ObjectUndefined);

        request.method_id = 6;
        request.method_invocation_parameters = Some(Data::Long(1000));
        assert_eq!(handle_action(&mut clock, &request).result, ActionResult::OtherReason);
    }
}

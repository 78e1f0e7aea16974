//! COSEM Clock object model for DLMS metering.
//!
//! The crate models the Clock interface class (class 8) the way a DLMS/COSEM
//! client or server sees it: numbered attributes with typed wire values, a
//! read planner for polling cycles, and the six clock methods with their
//! time-rounding and shifting rules. It is `no_std` (with `alloc`) unless
//! the default `std` feature is enabled.
//!
//! ```
//! use cosem_clock::cosem::CosemObject;
//! use cosem_clock::{Clock, Data, DateTime};
//!
//! let mut clock = Clock::default();
//! clock.set_value(2, Data::DateTime(DateTime::new(2024, 3, 1, 10, 0, 31, 0).unwrap())).unwrap();
//! clock.invoke(3, None).unwrap();
//! assert_eq!(clock.value(2).unwrap(), Data::DateTime(DateTime::new(2024, 3, 1, 10, 1, 0, 0).unwrap()));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod action;
pub mod cosem;
pub mod data;
pub mod date_time;
pub mod error;
pub mod get;
pub mod obis_code;

pub use cosem::clock::{Clock, ClockBase};
pub use data::{Data, DataType};
pub use date_time::{ClockStatus, DateTime};
pub use error::{CosemError, Result};
pub use obis_code::ObisCode;

//! Safe access to TEMPer USB temperature/humidity sensors
//!
//! This crate wraps a handle-based native sensor library (libtempered) in
//! lifecycle-managed types:
//!
//! - [`Tempered`] guards library-wide initialisation and teardown
//! - [`Device`] owns one opened physical device and gates reads on it
//! - [`Sensor`] is a per-channel view carrying its [`SensorType`] capabilities
//!
//! The native library is reached only through the [`Provider`] trait. Enable
//! the `native` feature for [`LibTempered`]; [`sim::SimProvider`] runs without
//! hardware.
//!
//! # Example
//!
//! ```
//! use tempered::sim::SimProvider;
//! use tempered::{SensorType, Tempered};
//!
//! let mut tempered = Tempered::new(SimProvider::demo());
//! tempered.init().unwrap();
//!
//! for descriptor in tempered.enumerate().unwrap() {
//!     let device = tempered.open(descriptor).unwrap();
//!     device.update().unwrap();
//!     for sensor in device.sensors().unwrap() {
//!         if sensor.capability(SensorType::TEMPERATURE) {
//!             println!("{:.2} °C", sensor.temperature().unwrap());
//!         }
//!         if sensor.capability(SensorType::HUMIDITY) {
//!             println!("{:.1} %RH", sensor.humidity().unwrap());
//!         }
//!     }
//! }
//!
//! tempered.exit().unwrap();
//! ```

pub mod device;
pub mod error;
pub mod library;
pub mod provider;
pub mod sensor;
pub mod sim;
pub mod types;

#[cfg(feature = "native")]
pub mod native;

pub use device::Device;
pub use error::{Error, NativeError, Result};
pub use library::Tempered;
pub use provider::Provider;
pub use sensor::Sensor;
pub use types::{DeviceDescriptor, SensorType};

#[cfg(feature = "native")]
pub use native::{LibTempered, NativeDevice};

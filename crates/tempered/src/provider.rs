//! Native capability provider contract
//!
//! Everything that touches USB HID transport, device protocols or calibration
//! lives behind this trait. The lifecycle types in this crate only ever hold
//! a provider's opaque device token and hand it back on every call.

use crate::error::NativeError;
use crate::types::{DeviceDescriptor, SensorType};

/// Function contract of a native sensor library
///
/// All calls are synchronous. Implementations are not required to be
/// thread-safe; callers serialise access.
pub trait Provider {
    /// Opaque reference to an opened device
    ///
    /// Owned exclusively by one `Device` while it is open and consumed by
    /// [`Provider::close`].
    type Device;

    /// Initialise the library's global state
    fn init(&self) -> Result<(), NativeError>;

    /// Tear down the library's global state
    fn exit(&self) -> Result<(), NativeError>;

    /// List attached devices in native enumeration order
    ///
    /// Any native result buffer must be released before this returns.
    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, NativeError>;

    /// Open the physical device matching `identity`
    fn open(&self, identity: &DeviceDescriptor) -> Result<Self::Device, NativeError>;

    /// Release an opened device
    fn close(&self, device: Self::Device) -> Result<(), NativeError>;

    /// Number of sensor channels on the device
    fn sensor_count(&self, device: &Self::Device) -> usize;

    /// Capability mask of one sensor channel
    fn sensor_type(&self, device: &Self::Device, index: usize) -> SensorType;

    /// Refresh all readings from hardware; `false` if the refresh failed
    fn read_sensors(&self, device: &Self::Device) -> bool;

    /// Last refreshed temperature in degrees Celsius, if available
    fn temperature(&self, device: &Self::Device, index: usize) -> Option<f32>;

    /// Last refreshed relative humidity in percent, if available
    fn humidity(&self, device: &Self::Device, index: usize) -> Option<f32>;

    /// Most recent device-level error message, for diagnostics only
    fn last_error(&self, _device: &Self::Device) -> Option<String> {
        None
    }
}

//! Device handle
//!
//! This module provides a wrapper around a provider's opaque device token
//! with the descriptor that locates it and open-before-use gating.

use crate::error::{Error, Result};
use crate::library::Tempered;
use crate::provider::Provider;
use crate::sensor::Sensor;
use crate::types::DeviceDescriptor;
use std::fmt;
use tracing::{debug, trace, warn};

/// One physical sensor device
///
/// Closed when created. Value queries need an open device and should follow
/// at least one successful [`Device::update`]. An open device is closed when
/// dropped.
pub struct Device<'t, P: Provider> {
    /// Provider owned by the library handle this device came from
    provider: &'t P,
    /// Identity used to locate the device at open time
    descriptor: DeviceDescriptor,
    /// Native device reference (if opened)
    handle: Option<P::Device>,
}

impl<'t, P: Provider> Device<'t, P> {
    /// Create a closed device handle
    pub fn new(tempered: &'t Tempered<P>, descriptor: DeviceDescriptor) -> Self {
        Self {
            provider: tempered.provider(),
            descriptor,
            handle: None,
        }
    }

    /// Get the device descriptor
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    /// Get the device node path
    pub fn path(&self) -> &str {
        &self.descriptor.path
    }

    /// Get the device type name
    pub fn type_name(&self) -> &str {
        &self.descriptor.type_name
    }

    /// Get the USB Vendor ID
    pub fn vendor_id(&self) -> u16 {
        self.descriptor.vendor_id
    }

    /// Get the USB Product ID
    pub fn product_id(&self) -> u16 {
        self.descriptor.product_id
    }

    /// Get the USB interface number
    pub fn interface_number(&self) -> i32 {
        self.descriptor.interface_number
    }

    /// Check if device is open
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Open the device
    ///
    /// No-op when already open; the physical device is not re-validated.
    /// On failure the provider's message is returned as [`Error::Native`]
    /// and the handle stays closed.
    pub fn open(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(()); // Already open
        }

        let handle = self.provider.open(&self.descriptor).map_err(|e| {
            debug!("Failed to open device {}: {}", self.descriptor.path, e);
            Error::from(e)
        })?;

        self.handle = Some(handle);
        debug!("Opened device {}", self.descriptor);
        Ok(())
    }

    /// Close the device
    ///
    /// No-op when already closed. A failure reported by the provider is not
    /// returned: it is emitted as a warning and the handle is cleared anyway.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.provider.close(handle) {
                warn!("Error closing device {}: {}", self.descriptor.path, e);
            }
            debug!("Closed device {}", self.descriptor.path);
        }
    }

    /// Number of sensor channels reported for this device
    pub fn sensor_count(&self) -> Result<usize> {
        let handle = self.native()?;
        Ok(self.provider.sensor_count(handle))
    }

    /// Refresh all sensor readings from the hardware
    ///
    /// All-or-nothing: either every reading was refreshed or
    /// [`Error::UpdateFailure`] is returned.
    pub fn update(&self) -> Result<()> {
        let handle = self.native()?;

        if !self.provider.read_sensors(handle) {
            debug!(
                "Failed to update sensors on {}: {}",
                self.descriptor.path,
                self.provider
                    .last_error(handle)
                    .as_deref()
                    .unwrap_or("no details")
            );
            return Err(Error::UpdateFailure);
        }

        trace!("Updated sensors on {}", self.descriptor.path);
        Ok(())
    }

    /// Enumerate sensor channels in index order
    ///
    /// Views are only valid for this open session; they borrow the device,
    /// so it cannot be closed or reopened while any of them is alive.
    pub fn sensors(&self) -> Result<Vec<Sensor<'_, 't, P>>> {
        let handle = self.native()?;
        let count = self.provider.sensor_count(handle);

        Ok((0..count)
            .map(|index| Sensor::new(self, index, self.provider.sensor_type(handle, index)))
            .collect())
    }

    /// Temperature of sensor `index` in degrees Celsius
    pub fn temperature(&self, index: usize) -> Result<f64> {
        let handle = self.native()?;
        let value = self.provider.temperature(handle, index);
        self.reading("temperature", index, value)
    }

    /// Relative humidity of sensor `index` in percent
    pub fn humidity(&self, index: usize) -> Result<f64> {
        let handle = self.native()?;
        let value = self.provider.humidity(handle, index);
        self.reading("humidity", index, value)
    }

    /// Get the native reference, or `NotOpen`
    fn native(&self) -> Result<&P::Device> {
        self.handle.as_ref().ok_or(Error::NotOpen)
    }

    /// Widen a native reading or map its absence to `RetrievalFailure`
    fn reading(&self, quantity: &str, index: usize, value: Option<f32>) -> Result<f64> {
        match value {
            Some(v) => {
                trace!("{} sensor {} {} = {}", self.descriptor.path, index, quantity, v);
                Ok(f64::from(v))
            }
            None => {
                let details = self
                    .handle
                    .as_ref()
                    .and_then(|handle| self.provider.last_error(handle));
                debug!(
                    "Failed to read {} from {} sensor {}: {}",
                    quantity,
                    self.descriptor.path,
                    index,
                    details.as_deref().unwrap_or("no details")
                );
                Err(Error::RetrievalFailure)
            }
        }
    }
}

impl<P: Provider> fmt::Debug for Device<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("descriptor", &self.descriptor)
            .field("open", &self.is_open())
            .finish()
    }
}

impl<P: Provider> Drop for Device<'_, P> {
    fn drop(&mut self) {
        self.close();
    }
}

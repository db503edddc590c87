//! Sensor views

use crate::device::Device;
use crate::error::Result;
use crate::provider::Provider;
use crate::types::SensorType;
use std::fmt;

/// One sensor channel of an open device
///
/// Obtained from [`Device::sensors`]. Reads delegate to the owning device, so
/// they fail with the same errors. Callers should check [`Sensor::capability`]
/// first; asking an incapable sensor surfaces as `RetrievalFailure` from the
/// provider rather than being rejected here.
pub struct Sensor<'d, 't, P: Provider> {
    device: &'d Device<'t, P>,
    index: usize,
    type_mask: SensorType,
}

impl<'d, 't, P: Provider> Sensor<'d, 't, P> {
    pub(crate) fn new(device: &'d Device<'t, P>, index: usize, type_mask: SensorType) -> Self {
        Self {
            device,
            index,
            type_mask,
        }
    }

    /// 0-based channel index on the owning device
    pub fn index(&self) -> usize {
        self.index
    }

    /// Capability mask reported when the view was created
    pub fn type_mask(&self) -> SensorType {
        self.type_mask
    }

    /// Check whether the sensor reports every quantity in `kind`
    pub fn capability(&self, kind: SensorType) -> bool {
        self.type_mask.is_type(kind)
    }

    /// The device this sensor belongs to
    pub fn device(&self) -> &'d Device<'t, P> {
        self.device
    }

    /// Temperature in degrees Celsius
    pub fn temperature(&self) -> Result<f64> {
        self.device.temperature(self.index)
    }

    /// Relative humidity in percent
    pub fn humidity(&self) -> Result<f64> {
        self.device.humidity(self.index)
    }
}

impl<P: Provider> fmt::Debug for Sensor<'_, '_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("device", &self.device.path())
            .field("index", &self.index)
            .field("type_mask", &self.type_mask)
            .finish()
    }
}

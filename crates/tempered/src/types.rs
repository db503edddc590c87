//! Device identity and sensor capability types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Identity of a physical sensor device
///
/// Produced by `Tempered::enumerate`. The five fields are exactly what the
/// native library needs to locate the same device again when it is opened.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Device node path (e.g. `/dev/hidraw3`)
    pub path: String,
    /// Human readable device type (e.g. `TEMPerV1.4`)
    pub type_name: String,
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// USB interface number
    pub interface_number: i32,
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:04x}:{:04x} {} (interface {})",
            self.path, self.vendor_id, self.product_id, self.type_name, self.interface_number
        )
    }
}

/// Capability mask of a sensor channel
///
/// A set of the physical quantities a sensor can report. Bit values match the
/// native library: temperature is `1`, humidity is `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorType(u32);

impl SensorType {
    /// No capabilities
    pub const NONE: SensorType = SensorType(0);
    /// Reports temperature in degrees Celsius
    pub const TEMPERATURE: SensorType = SensorType(1);
    /// Reports relative humidity in percent
    pub const HUMIDITY: SensorType = SensorType(2);

    /// Build a mask from raw native bits
    pub const fn from_bits(bits: u32) -> Self {
        SensorType(bits)
    }

    /// Raw native bits
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check that every bit of `kind` is present
    ///
    /// Composite queries are allowed: `is_type(TEMPERATURE | HUMIDITY)` is
    /// true only for sensors that report both.
    pub const fn is_type(self, kind: SensorType) -> bool {
        self.0 & kind.0 == kind.0
    }

    /// Check whether the mask is empty
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for SensorType {
    type Output = SensorType;

    fn bitor(self, rhs: SensorType) -> SensorType {
        SensorType(self.0 | rhs.0)
    }
}

impl BitOrAssign for SensorType {
    fn bitor_assign(&mut self, rhs: SensorType) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.is_type(SensorType::TEMPERATURE) {
            names.push("temperature");
        }
        if self.is_type(SensorType::HUMIDITY) {
            names.push("humidity");
        }
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("+"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_mask_has_both() {
        let mask = SensorType::TEMPERATURE | SensorType::HUMIDITY;
        assert!(mask.is_type(SensorType::TEMPERATURE));
        assert!(mask.is_type(SensorType::HUMIDITY));
        assert!(mask.is_type(SensorType::TEMPERATURE | SensorType::HUMIDITY));
        assert_eq!(mask.bits(), 3);
    }

    #[test]
    fn test_composite_query_needs_all_bits() {
        let mask = SensorType::TEMPERATURE;
        assert!(mask.is_type(SensorType::TEMPERATURE));
        assert!(!mask.is_type(SensorType::HUMIDITY));
        assert!(!mask.is_type(SensorType::TEMPERATURE | SensorType::HUMIDITY));
    }

    #[test]
    fn test_display() {
        assert_eq!(SensorType::NONE.to_string(), "none");
        assert_eq!(SensorType::HUMIDITY.to_string(), "humidity");
        assert_eq!(
            (SensorType::TEMPERATURE | SensorType::HUMIDITY).to_string(),
            "temperature+humidity"
        );
    }

    #[test]
    fn test_descriptor_display() {
        let desc = DeviceDescriptor {
            path: "/dev/hidraw3".to_string(),
            type_name: "TEMPerV1.4".to_string(),
            vendor_id: 0x1a86,
            product_id: 0x5523,
            interface_number: 0,
        };
        assert_eq!(
            desc.to_string(),
            "/dev/hidraw3 1a86:5523 TEMPerV1.4 (interface 0)"
        );
    }

    #[test]
    fn test_descriptor_serde() {
        let desc = DeviceDescriptor {
            path: "/dev/hidraw5".to_string(),
            type_name: "TEMPerHUM".to_string(),
            vendor_id: 0x0c45,
            product_id: 0x7401,
            interface_number: 1,
        };
        let json = serde_json::to_string(&desc).unwrap();
        let back: DeviceDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);

        let mask: SensorType = serde_json::from_str("3").unwrap();
        assert_eq!(mask, SensorType::TEMPERATURE | SensorType::HUMIDITY);
    }
}

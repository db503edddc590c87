//! Device selection by VID:PID filters and path

use anyhow::{Result, anyhow};
use std::fmt;
use std::str::FromStr;
use tempered::DeviceDescriptor;

/// VID:PID pattern, `*` matching any ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
}

impl DeviceFilter {
    /// Check if a VID/PID pair matches this filter
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id.is_none_or(|v| v == vendor_id)
            && self.product_id.is_none_or(|p| p == product_id)
    }

    fn parse_id(id: &str, name: &str) -> Result<Option<u16>> {
        if id == "*" {
            return Ok(None);
        }

        let Some(hex_part) = id.strip_prefix("0x").or_else(|| id.strip_prefix("0X")) else {
            return Err(anyhow!(
                "Invalid {} '{}', must start with '0x' (e.g., '0x1234')",
                name,
                id
            ));
        };

        if hex_part.is_empty() || hex_part.len() > 4 {
            return Err(anyhow!(
                "Invalid {} '{}', hex part must be 1-4 digits",
                name,
                id
            ));
        }

        u16::from_str_radix(hex_part, 16)
            .map(Some)
            .map_err(|_| anyhow!("Invalid {} '{}', not a valid hex number", name, id))
    }
}

impl FromStr for DeviceFilter {
    type Err = anyhow::Error;

    fn from_str(filter: &str) -> Result<Self> {
        let Some((vid, pid)) = filter.split_once(':') else {
            return Err(anyhow!(
                "Invalid filter format '{}', expected VID:PID (e.g., '0x1a86:0x5523' or '0x1a86:*')",
                filter
            ));
        };

        Ok(Self {
            vendor_id: Self::parse_id(vid, "VID")?,
            product_id: Self::parse_id(pid, "PID")?,
        })
    }
}

impl fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.vendor_id {
            Some(vid) => write!(f, "0x{:04x}:", vid)?,
            None => write!(f, "*:")?,
        }
        match self.product_id {
            Some(pid) => write!(f, "0x{:04x}", pid),
            None => write!(f, "*"),
        }
    }
}

/// Keep descriptors allowed by `filters` and, if given, at `path`
///
/// No filters means every device is allowed. Enumeration order is kept.
pub fn select(
    descriptors: Vec<DeviceDescriptor>,
    filters: &[DeviceFilter],
    path: Option<&str>,
) -> Vec<DeviceDescriptor> {
    descriptors
        .into_iter()
        .filter(|d| {
            filters.is_empty()
                || filters
                    .iter()
                    .any(|f| f.matches(d.vendor_id, d.product_id))
        })
        .filter(|d| path.is_none_or(|p| d.path == p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(path: &str, vendor_id: u16, product_id: u16) -> DeviceDescriptor {
        DeviceDescriptor {
            path: path.to_string(),
            type_name: "TEMPer".to_string(),
            vendor_id,
            product_id,
            interface_number: 0,
        }
    }

    #[test]
    fn test_parse_exact_filter() {
        let filter: DeviceFilter = "0x1a86:0x5523".parse().unwrap();
        assert_eq!(filter.vendor_id, Some(0x1a86));
        assert_eq!(filter.product_id, Some(0x5523));
        assert!(filter.matches(0x1a86, 0x5523));
        assert!(!filter.matches(0x1a86, 0x5524));
    }

    #[test]
    fn test_parse_wildcards() {
        let filter: DeviceFilter = "0X0c45:*".parse().unwrap();
        assert!(filter.matches(0x0c45, 0x7401));
        assert!(filter.matches(0x0c45, 0x0001));
        assert!(!filter.matches(0x1a86, 0x7401));

        let any: DeviceFilter = "*:*".parse().unwrap();
        assert!(any.matches(0xffff, 0x0000));
    }

    #[test]
    fn test_invalid_filters() {
        assert!("1a86:5523".parse::<DeviceFilter>().is_err());
        assert!("0x1a86".parse::<DeviceFilter>().is_err());
        assert!("0x:0x5523".parse::<DeviceFilter>().is_err());
        assert!("0x12345:*".parse::<DeviceFilter>().is_err());
        assert!("0xzz:*".parse::<DeviceFilter>().is_err());
    }

    #[test]
    fn test_display() {
        let filter: DeviceFilter = "0x1A86:*".parse().unwrap();
        assert_eq!(filter.to_string(), "0x1a86:*");
    }

    #[test]
    fn test_select_keeps_order() {
        let descriptors = vec![
            descriptor("/dev/hidraw5", 0x0c45, 0x7401),
            descriptor("/dev/hidraw3", 0x1a86, 0x5523),
            descriptor("/dev/hidraw7", 0x0c45, 0x7402),
        ];
        let filters: [DeviceFilter; 1] = ["0x0c45:*".parse().unwrap()];

        let selected = select(descriptors.clone(), &filters, None);
        let paths: Vec<&str> = selected.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["/dev/hidraw5", "/dev/hidraw7"]);

        assert_eq!(select(descriptors.clone(), &[], None).len(), 3);
        assert_eq!(
            select(descriptors, &[], Some("/dev/hidraw3"))[0].product_id,
            0x5523
        );
    }
}

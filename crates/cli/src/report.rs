//! Reading devices and printing results

use crate::config::OutputFormat;
use anyhow::{Context, Result};
use serde::Serialize;
use tempered::{Device, DeviceDescriptor, Provider, SensorType};
use tracing::warn;

/// Readings of one sensor channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub index: usize,
    pub capabilities: SensorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity_pct: Option<f64>,
    /// Advertised quantities that could not be read
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Result of reading one device
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    #[serde(flatten)]
    pub descriptor: DeviceDescriptor,
    pub sensors: Vec<SensorReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeviceReport {
    /// Whether the device or any advertised reading could not be read
    pub fn failed(&self) -> bool {
        self.error.is_some() || self.sensors.iter().any(|s| !s.errors.is_empty())
    }

    /// Error messages for this device, one per failure
    pub fn failures(&self) -> Vec<String> {
        match &self.error {
            Some(error) => vec![error.clone()],
            None => self
                .sensors
                .iter()
                .flat_map(|s| s.errors.iter().map(move |e| format!("sensor {}: {}", s.index, e)))
                .collect(),
        }
    }
}

/// Open, refresh and read every sensor of `device`, then close it
///
/// Each quantity advertised by a sensor's capability mask is read. A failed
/// value is left out and recorded in the sensor's `errors`.
pub fn read_device<P: Provider>(device: &mut Device<'_, P>) -> DeviceReport {
    let outcome = read_sensors(device);
    device.close();

    let (sensors, error) = match outcome {
        Ok(sensors) => (sensors, None),
        Err(e) => (Vec::new(), Some(e.to_string())),
    };

    DeviceReport {
        descriptor: device.descriptor().clone(),
        sensors,
        error,
    }
}

fn read_sensors<P: Provider>(device: &mut Device<'_, P>) -> tempered::Result<Vec<SensorReading>> {
    device.open()?;
    let device: &Device<'_, P> = device;
    device.update()?;

    let readings = device
        .sensors()?
        .iter()
        .map(|sensor| {
            let mut errors = Vec::new();
            let temperature_c = sensor
                .capability(SensorType::TEMPERATURE)
                .then(|| record(sensor.temperature(), "temperature", &mut errors))
                .flatten();
            let humidity_pct = sensor
                .capability(SensorType::HUMIDITY)
                .then(|| record(sensor.humidity(), "humidity", &mut errors))
                .flatten();
            if !errors.is_empty() {
                warn!("{} sensor {}: {}", device.path(), sensor.index(), errors.join(", "));
            }

            SensorReading {
                index: sensor.index(),
                capabilities: sensor.type_mask(),
                temperature_c,
                humidity_pct,
                errors,
            }
        })
        .collect();

    Ok(readings)
}

/// Keep a read value, or note why it is missing
fn record(value: tempered::Result<f64>, quantity: &str, errors: &mut Vec<String>) -> Option<f64> {
    value
        .inspect_err(|e| errors.push(format!("{}: {}", quantity, e)))
        .ok()
}

/// Print the device list
pub fn print_devices(descriptors: &[DeviceDescriptor], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(descriptors)
                .context("Failed to serialize device list")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            if descriptors.is_empty() {
                println!("No sensor devices found.");
            }
            for descriptor in descriptors {
                println!("{}", descriptor);
            }
        }
    }
    Ok(())
}

/// Print device readings
///
/// Devices that could not be read at all are left to the caller's stderr
/// report in text mode.
pub fn print_reports(reports: &[DeviceReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(reports).context("Failed to serialize readings")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for report in reports.iter().filter(|r| r.error.is_none()) {
                println!("{}", render_text(report));
            }
        }
    }
    Ok(())
}

fn render_text(report: &DeviceReport) -> String {
    let mut out = report.descriptor.to_string();
    for sensor in &report.sensors {
        if let Some(t) = sensor.temperature_c {
            out.push_str(&format!("\n  sensor {}: temperature {:.2} °C", sensor.index, t));
        }
        if let Some(h) = sensor.humidity_pct {
            out.push_str(&format!("\n  sensor {}: humidity {:.1} %RH", sensor.index, h));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempered::Tempered;
    use tempered::sim::{SimDevice, SimProvider};

    #[test]
    fn test_read_demo_devices() {
        let sim = SimProvider::demo();
        let mut tempered = Tempered::new(sim.clone());
        tempered.init().unwrap();

        let reports: Vec<DeviceReport> = tempered
            .devices()
            .unwrap()
            .iter_mut()
            .map(read_device)
            .collect();

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| !r.failed()));
        assert_eq!(
            reports[0].sensors,
            [SensorReading {
                index: 0,
                capabilities: SensorType::TEMPERATURE,
                temperature_c: Some(22.25),
                humidity_pct: None,
                errors: Vec::new(),
            }]
        );
        assert_eq!(reports[1].sensors[0].humidity_pct, Some(48.0));
        assert_eq!(sim.open_count(), 0);
    }

    #[test]
    fn test_failed_device_is_reported_and_closed() {
        let sim = SimProvider::new()
            .with_device(SimDevice::temper("/dev/hidraw3", 20.0).with_update_failure());
        let mut tempered = Tempered::new(sim.clone());
        tempered.init().unwrap();

        let mut devices = tempered.devices().unwrap();
        let report = read_device(&mut devices[0]);

        assert!(report.failed());
        assert_eq!(
            report.error.as_deref(),
            Some("tempered: failed to update sensors")
        );
        assert!(!devices[0].is_open());
        assert_eq!(sim.open_count(), 0);
    }

    #[test]
    fn test_unreadable_advertised_value_fails_device() {
        let sim = SimProvider::new().with_device(
            SimDevice::new("/dev/hidraw4", "TEMPerHUM", 0x0c45, 0x7401, 1)
                .with_sensor(SensorType::TEMPERATURE, 21.0, 0.0)
                .with_unreadable_sensor(SensorType::HUMIDITY),
        );
        let mut tempered = Tempered::new(sim.clone());
        tempered.init().unwrap();

        let mut devices = tempered.devices().unwrap();
        let report = read_device(&mut devices[0]);

        assert!(report.error.is_none());
        assert!(report.failed());
        assert_eq!(report.sensors[0].temperature_c, Some(21.0));
        assert_eq!(report.sensors[1].humidity_pct, None);
        assert_eq!(
            report.failures(),
            ["sensor 1: humidity: tempered: failed to retrieve sensor reading"]
        );
        assert_eq!(sim.open_count(), 0);
    }

    #[test]
    fn test_render_text() {
        let report = DeviceReport {
            descriptor: DeviceDescriptor {
                path: "/dev/hidraw5".to_string(),
                type_name: "TEMPerHUM".to_string(),
                vendor_id: 0x0c45,
                product_id: 0x7401,
                interface_number: 1,
            },
            sensors: vec![SensorReading {
                index: 0,
                capabilities: SensorType::TEMPERATURE | SensorType::HUMIDITY,
                temperature_c: Some(19.5),
                humidity_pct: Some(48.0),
                errors: Vec::new(),
            }],
            error: None,
        };

        assert_eq!(
            render_text(&report),
            "/dev/hidraw5 0c45:7401 TEMPerHUM (interface 1)\n  \
             sensor 0: temperature 19.50 °C\n  \
             sensor 0: humidity 48.0 %RH"
        );
    }

    #[test]
    fn test_json_shape() {
        let report = DeviceReport {
            descriptor: DeviceDescriptor {
                path: "/dev/hidraw3".to_string(),
                type_name: "TEMPerV1.4".to_string(),
                vendor_id: 0x1a86,
                product_id: 0x5523,
                interface_number: 0,
            },
            sensors: vec![SensorReading {
                index: 0,
                capabilities: SensorType::TEMPERATURE,
                temperature_c: Some(22.25),
                humidity_pct: None,
                errors: Vec::new(),
            }],
            error: None,
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["path"], "/dev/hidraw3");
        assert_eq!(value["vendor_id"], 0x1a86);
        assert_eq!(value["sensors"][0]["capabilities"], 1);
        assert_eq!(value["sensors"][0]["temperature_c"], 22.25);
        assert!(value["sensors"][0].get("humidity_pct").is_none());
        assert!(value.get("error").is_none());
        assert!(value["sensors"][0].get("errors").is_none());
    }
}

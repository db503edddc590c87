//! Simulated sensor library
//!
//! Provides an in-process [`Provider`] backed by a scripted device table, for
//! tests and for running without hardware attached.
//!
//! # Example
//!
//! ```
//! use tempered::sim::{SimDevice, SimProvider};
//! use tempered::{SensorType, Tempered};
//!
//! let sim = SimProvider::new().with_device(
//!     SimDevice::new("/dev/hidraw3", "TEMPerV1.4", 0x1a86, 0x5523, 0)
//!         .with_sensor(SensorType::TEMPERATURE, 21.5, 0.0),
//! );
//!
//! let mut tempered = Tempered::new(sim.clone());
//! tempered.init().unwrap();
//! let descriptors = tempered.enumerate().unwrap();
//! let device = tempered.open(descriptors[0].clone()).unwrap();
//! device.update().unwrap();
//! assert_eq!(device.temperature(0).unwrap(), 21.5);
//! ```

use crate::error::NativeError;
use crate::provider::Provider;
use crate::types::{DeviceDescriptor, SensorType};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// One simulated sensor channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimSensor {
    /// Capability mask reported for the channel
    pub type_mask: SensorType,
    /// Temperature returned when the mask includes `TEMPERATURE`
    pub temperature: f32,
    /// Humidity returned when the mask includes `HUMIDITY`
    pub humidity: f32,
    /// When false, advertised quantities still fail to read
    pub readable: bool,
}

/// One simulated device
#[derive(Debug, Clone)]
pub struct SimDevice {
    /// Identity reported by enumeration and matched at open time
    pub descriptor: DeviceDescriptor,
    /// Sensor channels in index order
    pub sensors: Vec<SimSensor>,
    /// Message returned by `open` instead of opening
    pub open_failure: Option<String>,
    /// Message returned by `close` (the device is released regardless)
    pub close_failure: Option<String>,
    /// Make every refresh fail
    pub update_fails: bool,
}

impl SimDevice {
    /// Create a device with no sensors
    pub fn new(
        path: &str,
        type_name: &str,
        vendor_id: u16,
        product_id: u16,
        interface_number: i32,
    ) -> Self {
        Self {
            descriptor: DeviceDescriptor {
                path: path.to_string(),
                type_name: type_name.to_string(),
                vendor_id,
                product_id,
                interface_number,
            },
            sensors: Vec::new(),
            open_failure: None,
            close_failure: None,
            update_fails: false,
        }
    }

    /// Single temperature sensor, like a TEMPer 1.4 stick
    pub fn temper(path: &str, celsius: f32) -> Self {
        Self::new(path, "TEMPerV1.4", 0x1a86, 0x5523, 0).with_sensor(
            SensorType::TEMPERATURE,
            celsius,
            0.0,
        )
    }

    /// Combined temperature and humidity sensor, like a TEMPerHUM
    pub fn temper_hum(path: &str, celsius: f32, humidity: f32) -> Self {
        Self::new(path, "TEMPerHUM", 0x0c45, 0x7401, 1).with_sensor(
            SensorType::TEMPERATURE | SensorType::HUMIDITY,
            celsius,
            humidity,
        )
    }

    /// Append a sensor channel
    pub fn with_sensor(mut self, type_mask: SensorType, temperature: f32, humidity: f32) -> Self {
        self.sensors.push(SimSensor {
            type_mask,
            temperature,
            humidity,
            readable: true,
        });
        self
    }

    /// Append a channel that advertises `type_mask` but never yields a value
    pub fn with_unreadable_sensor(mut self, type_mask: SensorType) -> Self {
        self.sensors.push(SimSensor {
            type_mask,
            temperature: 0.0,
            humidity: 0.0,
            readable: false,
        });
        self
    }

    /// Make `open` fail with `message`
    pub fn with_open_failure(mut self, message: &str) -> Self {
        self.open_failure = Some(message.to_string());
        self
    }

    /// Make `close` report `message`
    pub fn with_close_failure(mut self, message: &str) -> Self {
        self.close_failure = Some(message.to_string());
        self
    }

    /// Make every refresh fail
    pub fn with_update_failure(mut self) -> Self {
        self.update_fails = true;
        self
    }
}

/// Number of times each native entry point was reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub init: u32,
    pub exit: u32,
    pub enumerate: u32,
    pub open: u32,
    pub close: u32,
    pub read_sensors: u32,
}

/// Opaque reference to an opened simulated device
#[derive(Debug)]
pub struct SimHandle {
    id: u64,
    device: usize,
}

#[derive(Debug, Default)]
struct SimState {
    devices: Vec<SimDevice>,
    initialized: bool,
    init_failure: Option<String>,
    exit_failure: Option<String>,
    enumerate_failure: Option<String>,
    next_handle: u64,
    open_handles: HashSet<u64>,
    refreshed: HashSet<u64>,
    last_errors: HashMap<u64, String>,
    calls: CallCounts,
}

/// Scripted in-process sensor library
///
/// Clones share state, so a test can keep one clone for inspection after
/// handing another to [`crate::Tempered`].
#[derive(Debug, Clone, Default)]
pub struct SimProvider {
    state: Rc<RefCell<SimState>>,
}

impl SimProvider {
    /// Create a library with no devices attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Library with a TEMPer stick on `/dev/hidraw3` and a TEMPerHUM on
    /// `/dev/hidraw5`
    pub fn demo() -> Self {
        Self::new()
            .with_device(SimDevice::temper("/dev/hidraw3", 22.25))
            .with_device(SimDevice::temper_hum("/dev/hidraw5", 19.5, 48.0))
    }

    /// Attach a device
    pub fn with_device(self, device: SimDevice) -> Self {
        self.state.borrow_mut().devices.push(device);
        self
    }

    /// Make `init` fail with `message` (`None` to succeed again)
    pub fn set_init_failure(&self, message: Option<&str>) {
        self.state.borrow_mut().init_failure = message.map(str::to_string);
    }

    /// Make `exit` fail with `message` (`None` to succeed again)
    pub fn set_exit_failure(&self, message: Option<&str>) {
        self.state.borrow_mut().exit_failure = message.map(str::to_string);
    }

    /// Make `enumerate` fail with `message` (`None` to succeed again)
    pub fn set_enumerate_failure(&self, message: Option<&str>) {
        self.state.borrow_mut().enumerate_failure = message.map(str::to_string);
    }

    /// Toggle refresh failures for the device at `path`
    pub fn set_update_failure(&self, path: &str, fails: bool) {
        let mut state = self.state.borrow_mut();
        for device in state.devices.iter_mut().filter(|d| d.descriptor.path == path) {
            device.update_fails = fails;
        }
    }

    /// Whether the simulated library is initialised
    pub fn is_initialized(&self) -> bool {
        self.state.borrow().initialized
    }

    /// Number of currently open device references
    pub fn open_count(&self) -> usize {
        self.state.borrow().open_handles.len()
    }

    /// Entry point call counters
    pub fn calls(&self) -> CallCounts {
        self.state.borrow().calls
    }

    /// Look up the sensor for an open handle
    fn sensor(&self, handle: &SimHandle, index: usize) -> Option<SimSensor> {
        let state = self.state.borrow();
        if !state.refreshed.contains(&handle.id) {
            return None;
        }
        state
            .devices
            .get(handle.device)
            .and_then(|d| d.sensors.get(index))
            .copied()
    }

    fn record_error(&self, handle: &SimHandle, message: String) {
        self.state
            .borrow_mut()
            .last_errors
            .insert(handle.id, message);
    }
}

impl Provider for SimProvider {
    type Device = SimHandle;

    fn init(&self) -> Result<(), NativeError> {
        let mut state = self.state.borrow_mut();
        state.calls.init += 1;
        if let Some(message) = &state.init_failure {
            return Err(NativeError::new(message.clone()));
        }
        state.initialized = true;
        Ok(())
    }

    fn exit(&self) -> Result<(), NativeError> {
        let mut state = self.state.borrow_mut();
        state.calls.exit += 1;
        if let Some(message) = &state.exit_failure {
            return Err(NativeError::new(message.clone()));
        }
        state.initialized = false;
        Ok(())
    }

    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, NativeError> {
        let mut state = self.state.borrow_mut();
        state.calls.enumerate += 1;
        if !state.initialized {
            return Err(NativeError::new("library not initialised"));
        }
        if let Some(message) = &state.enumerate_failure {
            return Err(NativeError::new(message.clone()));
        }
        Ok(state
            .devices
            .iter()
            .map(|d| d.descriptor.clone())
            .collect())
    }

    fn open(&self, identity: &DeviceDescriptor) -> Result<SimHandle, NativeError> {
        let mut state = self.state.borrow_mut();
        state.calls.open += 1;
        if !state.initialized {
            return Err(NativeError::new("library not initialised"));
        }

        let device = state
            .devices
            .iter()
            .position(|d| &d.descriptor == identity)
            .ok_or_else(|| NativeError::new("device not found"))?;

        if let Some(message) = &state.devices[device].open_failure {
            return Err(NativeError::new(message.clone()));
        }

        let id = state.next_handle;
        state.next_handle += 1;
        state.open_handles.insert(id);
        Ok(SimHandle { id, device })
    }

    fn close(&self, device: SimHandle) -> Result<(), NativeError> {
        let mut state = self.state.borrow_mut();
        state.calls.close += 1;
        state.open_handles.remove(&device.id);
        state.refreshed.remove(&device.id);
        state.last_errors.remove(&device.id);

        match state
            .devices
            .get(device.device)
            .and_then(|d| d.close_failure.clone())
        {
            Some(message) => Err(NativeError::new(message)),
            None => Ok(()),
        }
    }

    fn sensor_count(&self, device: &SimHandle) -> usize {
        self.state
            .borrow()
            .devices
            .get(device.device)
            .map_or(0, |d| d.sensors.len())
    }

    fn sensor_type(&self, device: &SimHandle, index: usize) -> SensorType {
        self.state
            .borrow()
            .devices
            .get(device.device)
            .and_then(|d| d.sensors.get(index))
            .map_or(SensorType::NONE, |s| s.type_mask)
    }

    fn read_sensors(&self, device: &SimHandle) -> bool {
        let fails = {
            let mut state = self.state.borrow_mut();
            state.calls.read_sensors += 1;
            state
                .devices
                .get(device.device)
                .is_none_or(|d| d.update_fails)
        };

        if fails {
            self.record_error(device, "simulated read failure".to_string());
            return false;
        }

        self.state.borrow_mut().refreshed.insert(device.id);
        true
    }

    fn temperature(&self, device: &SimHandle, index: usize) -> Option<f32> {
        match self.sensor(device, index) {
            Some(s) if s.readable && s.type_mask.is_type(SensorType::TEMPERATURE) => Some(s.temperature),
            _ => {
                self.record_error(device, format!("sensor {} has no temperature", index));
                None
            }
        }
    }

    fn humidity(&self, device: &SimHandle, index: usize) -> Option<f32> {
        match self.sensor(device, index) {
            Some(s) if s.readable && s.type_mask.is_type(SensorType::HUMIDITY) => Some(s.humidity),
            _ => {
                self.record_error(device, format!("sensor {} has no humidity", index));
                None
            }
        }
    }

    fn last_error(&self, device: &SimHandle) -> Option<String> {
        self.state.borrow().last_errors.get(&device.id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_need_refresh() {
        let sim = SimProvider::new().with_device(SimDevice::temper("/dev/hidraw0", 20.0));
        sim.init().unwrap();
        let identity = sim.enumerate().unwrap().remove(0);
        let handle = sim.open(&identity).unwrap();

        assert_eq!(sim.temperature(&handle, 0), None);
        assert!(sim.read_sensors(&handle));
        assert_eq!(sim.temperature(&handle, 0), Some(20.0));
        assert_eq!(sim.humidity(&handle, 0), None);
        assert_eq!(
            sim.last_error(&handle).as_deref(),
            Some("sensor 0 has no humidity")
        );

        sim.close(handle).unwrap();
        assert_eq!(sim.open_count(), 0);
    }

    #[test]
    fn test_unreadable_sensor_advertises_but_fails() {
        let sim = SimProvider::new().with_device(
            SimDevice::new("/dev/hidraw0", "TEMPerHUM", 0x0c45, 0x7401, 1)
                .with_unreadable_sensor(SensorType::HUMIDITY),
        );
        sim.init().unwrap();
        let identity = sim.enumerate().unwrap().remove(0);
        let handle = sim.open(&identity).unwrap();
        assert!(sim.read_sensors(&handle));

        assert_eq!(sim.sensor_type(&handle, 0), SensorType::HUMIDITY);
        assert_eq!(sim.humidity(&handle, 0), None);
        sim.close(handle).unwrap();
    }

    #[test]
    fn test_open_matches_all_identity_fields() {
        let sim = SimProvider::new().with_device(SimDevice::temper("/dev/hidraw0", 20.0));
        sim.init().unwrap();
        let mut identity = sim.enumerate().unwrap().remove(0);
        identity.interface_number = 1;

        let err = sim.open(&identity).unwrap_err();
        assert_eq!(err.message(), "device not found");
    }

    #[test]
    fn test_enumerate_requires_init() {
        let sim = SimProvider::demo();
        assert!(sim.enumerate().is_err());
        sim.init().unwrap();
        assert_eq!(sim.enumerate().unwrap().len(), 2);
    }
}

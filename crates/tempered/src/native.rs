//! libtempered bindings
//!
//! [`LibTempered`] implements [`Provider`] on top of the C library. All raw
//! pointers stay inside this module; callers only see owned descriptors and
//! the opaque [`NativeDevice`] token.

use crate::error::NativeError;
use crate::provider::Provider;
use crate::types::{DeviceDescriptor, SensorType};
use std::ffi::{CStr, CString, c_char, c_float, c_int, c_ushort};
use std::ptr::{self, NonNull};

#[allow(non_camel_case_types)]
mod sys {
    use super::{c_char, c_float, c_int, c_ushort};

    /// `struct tempered_device_list`
    #[repr(C)]
    pub struct tempered_device_list {
        pub next: *mut tempered_device_list,
        pub path: *mut c_char,
        pub type_name: *mut c_char,
        pub vendor_id: c_ushort,
        pub product_id: c_ushort,
        pub interface_number: c_int,
    }

    /// `tempered_device` (opaque)
    #[repr(C)]
    pub struct tempered_device {
        _private: [u8; 0],
    }

    #[link(name = "tempered")]
    #[link(name = "hidapi-hidraw")]
    unsafe extern "C" {
        pub fn tempered_init(error: *mut *mut c_char) -> bool;
        pub fn tempered_exit(error: *mut *mut c_char) -> bool;
        pub fn tempered_enumerate(error: *mut *mut c_char) -> *mut tempered_device_list;
        pub fn tempered_free_device_list(list: *mut tempered_device_list);
        pub fn tempered_open(
            list: *mut tempered_device_list,
            error: *mut *mut c_char,
        ) -> *mut tempered_device;
        pub fn tempered_close(device: *mut tempered_device);
        pub fn tempered_error(device: *mut tempered_device) -> *const c_char;
        pub fn tempered_read_sensors(device: *mut tempered_device) -> bool;
        pub fn tempered_get_sensor_count(device: *mut tempered_device) -> c_int;
        pub fn tempered_get_sensor_type(device: *mut tempered_device, sensor: c_int) -> c_int;
        pub fn tempered_get_temperature(
            device: *mut tempered_device,
            sensor: c_int,
            temp_c: *mut c_float,
        ) -> bool;
        pub fn tempered_get_humidity(
            device: *mut tempered_device,
            sensor: c_int,
            rel_hum: *mut c_float,
        ) -> bool;
    }
}

/// Opened libtempered device
///
/// Never dereferenced outside the library calls. Not `Send`: the C library
/// keeps unsynchronised global state.
#[derive(Debug)]
pub struct NativeDevice(NonNull<sys::tempered_device>);

/// Frees an enumeration result when dropped
struct DeviceList(NonNull<sys::tempered_device_list>);

impl Drop for DeviceList {
    fn drop(&mut self) {
        // SAFETY: the pointer came from tempered_enumerate and is freed once.
        unsafe { sys::tempered_free_device_list(self.0.as_ptr()) };
    }
}

/// Provider backed by the C libtempered
#[derive(Debug, Default)]
pub struct LibTempered {
    _private: (),
}

impl LibTempered {
    /// Create the provider; nothing is called until `init`
    pub fn new() -> Self {
        Self::default()
    }
}

/// Take ownership of a library-allocated error message
///
/// # Safety
///
/// `message` must be NULL or a NUL-terminated string allocated with
/// `malloc` that the caller owns.
unsafe fn take_error(message: *mut c_char) -> NativeError {
    if message.is_null() {
        return NativeError::new("unknown error");
    }
    // SAFETY: non-null, NUL-terminated per the function contract.
    let text = unsafe { CStr::from_ptr(message) }
        .to_string_lossy()
        .into_owned();
    // SAFETY: the library hands ownership of the message to the caller.
    unsafe { libc::free(message.cast()) };
    NativeError(text)
}

/// Copy a borrowed C string, treating NULL as empty
///
/// Non-UTF-8 input is rejected rather than replaced: descriptors are handed
/// back to `tempered_open` as lookup keys and must round-trip byte for byte.
///
/// # Safety
///
/// `s` must be NULL or point to a NUL-terminated string valid for the call.
unsafe fn copy_str(field: &str, s: *const c_char) -> Result<String, NativeError> {
    if s.is_null() {
        return Ok(String::new());
    }
    // SAFETY: non-null, NUL-terminated per the function contract.
    unsafe { CStr::from_ptr(s) }
        .to_str()
        .map(str::to_owned)
        .map_err(|_| NativeError(format!("{} is not valid UTF-8", field)))
}

/// Copy every node of an enumeration list, in list order
///
/// # Safety
///
/// `head` and every node reached through `next` must be valid list nodes whose
/// strings are NULL or NUL-terminated, all alive for the call.
unsafe fn descriptors(
    head: NonNull<sys::tempered_device_list>,
) -> Result<Vec<DeviceDescriptor>, NativeError> {
    let mut devices = Vec::new();
    let mut node = head.as_ptr().cast_const();
    while !node.is_null() {
        // SAFETY: node is a valid list node per the function contract.
        let entry = unsafe { &*node };
        devices.push(DeviceDescriptor {
            // SAFETY: list strings are NULL or NUL-terminated.
            path: unsafe { copy_str("path", entry.path) }?,
            // SAFETY: as above.
            type_name: unsafe { copy_str("type_name", entry.type_name) }?,
            vendor_id: entry.vendor_id,
            product_id: entry.product_id,
            interface_number: entry.interface_number,
        });
        node = entry.next.cast_const();
    }
    Ok(devices)
}

/// Native sensor count, negative meaning none
fn sensor_count_from(count: c_int) -> usize {
    usize::try_from(count).unwrap_or(0)
}

/// Native capability bits, negative meaning none
fn mask_from(bits: c_int) -> SensorType {
    SensorType::from_bits(u32::try_from(bits).unwrap_or(0))
}

fn c_string(field: &str, value: &str) -> Result<CString, NativeError> {
    CString::new(value).map_err(|_| NativeError(format!("{} contains a NUL byte", field)))
}

fn sensor_index(index: usize) -> Option<c_int> {
    c_int::try_from(index).ok()
}

impl Provider for LibTempered {
    type Device = NativeDevice;

    fn init(&self) -> Result<(), NativeError> {
        let mut error = ptr::null_mut();
        // SAFETY: error is a valid out-pointer.
        if unsafe { sys::tempered_init(&mut error) } {
            Ok(())
        } else {
            // SAFETY: on failure the library stores an owned message in error.
            Err(unsafe { take_error(error) })
        }
    }

    fn exit(&self) -> Result<(), NativeError> {
        let mut error = ptr::null_mut();
        // SAFETY: error is a valid out-pointer.
        if unsafe { sys::tempered_exit(&mut error) } {
            Ok(())
        } else {
            // SAFETY: on failure the library stores an owned message in error.
            Err(unsafe { take_error(error) })
        }
    }

    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, NativeError> {
        let mut error = ptr::null_mut();
        // SAFETY: error is a valid out-pointer.
        let head = unsafe { sys::tempered_enumerate(&mut error) };
        let Some(head) = NonNull::new(head) else {
            // SAFETY: a NULL list comes with an owned message in error.
            return Err(unsafe { take_error(error) });
        };
        let list = DeviceList(head);

        // SAFETY: the list is owned by `list`, which frees it on return either way.
        let devices = unsafe { descriptors(list.0) };
        drop(list);
        devices
    }

    fn open(&self, identity: &DeviceDescriptor) -> Result<NativeDevice, NativeError> {
        let path = c_string("path", &identity.path)?;
        let type_name = c_string("type_name", &identity.type_name)?;

        let mut entry = sys::tempered_device_list {
            next: ptr::null_mut(),
            path: path.as_ptr().cast_mut(),
            type_name: type_name.as_ptr().cast_mut(),
            vendor_id: identity.vendor_id,
            product_id: identity.product_id,
            interface_number: identity.interface_number,
        };

        let mut error = ptr::null_mut();
        // SAFETY: entry and its strings are valid for the duration of the call;
        // the library only reads them.
        let device = unsafe { sys::tempered_open(&mut entry, &mut error) };
        match NonNull::new(device) {
            Some(device) => Ok(NativeDevice(device)),
            // SAFETY: a NULL device comes with an owned message in error.
            None => Err(unsafe { take_error(error) }),
        }
    }

    fn close(&self, device: NativeDevice) -> Result<(), NativeError> {
        // SAFETY: the token came from tempered_open and is consumed here.
        unsafe { sys::tempered_close(device.0.as_ptr()) };
        Ok(())
    }

    fn sensor_count(&self, device: &NativeDevice) -> usize {
        // SAFETY: the token is an open device.
        sensor_count_from(unsafe { sys::tempered_get_sensor_count(device.0.as_ptr()) })
    }

    fn sensor_type(&self, device: &NativeDevice, index: usize) -> SensorType {
        let Some(index) = sensor_index(index) else {
            return SensorType::NONE;
        };
        // SAFETY: the token is an open device.
        mask_from(unsafe { sys::tempered_get_sensor_type(device.0.as_ptr(), index) })
    }

    fn read_sensors(&self, device: &NativeDevice) -> bool {
        // SAFETY: the token is an open device.
        unsafe { sys::tempered_read_sensors(device.0.as_ptr()) }
    }

    fn temperature(&self, device: &NativeDevice, index: usize) -> Option<f32> {
        let index = sensor_index(index)?;
        let mut value: c_float = 0.0;
        // SAFETY: the token is an open device and value is a valid out-pointer.
        unsafe { sys::tempered_get_temperature(device.0.as_ptr(), index, &mut value) }
            .then_some(value)
    }

    fn humidity(&self, device: &NativeDevice, index: usize) -> Option<f32> {
        let index = sensor_index(index)?;
        let mut value: c_float = 0.0;
        // SAFETY: the token is an open device and value is a valid out-pointer.
        unsafe { sys::tempered_get_humidity(device.0.as_ptr(), index, &mut value) }
            .then_some(value)
    }

    fn last_error(&self, device: &NativeDevice) -> Option<String> {
        // SAFETY: the token is an open device; the message is owned by the device.
        let message = unsafe { sys::tempered_error(device.0.as_ptr()) };
        if message.is_null() {
            return None;
        }
        // SAFETY: non-null and NUL-terminated.
        Some(
            unsafe { CStr::from_ptr(message) }
                .to_string_lossy()
                .into_owned(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nul_in_path_is_rejected() {
        let err = c_string("path", "/dev/hid\0raw0").unwrap_err();
        assert_eq!(err.message(), "path contains a NUL byte");
    }

    #[test]
    fn test_sensor_index_range() {
        assert_eq!(sensor_index(0), Some(0));
        assert_eq!(sensor_index(usize::MAX), None);
    }

    fn node(
        path: Option<&CString>,
        type_name: Option<&CString>,
        vendor_id: u16,
        product_id: u16,
        interface_number: c_int,
    ) -> sys::tempered_device_list {
        sys::tempered_device_list {
            next: ptr::null_mut(),
            path: path.map_or(ptr::null_mut(), |s| s.as_ptr().cast_mut()),
            type_name: type_name.map_or(ptr::null_mut(), |s| s.as_ptr().cast_mut()),
            vendor_id,
            product_id,
            interface_number,
        }
    }

    #[test]
    fn test_descriptors_walk_list_in_order() {
        let hidraw3 = CString::new("/dev/hidraw3").unwrap();
        let hidraw5 = CString::new("/dev/hidraw5").unwrap();
        let hidraw7 = CString::new("/dev/hidraw7").unwrap();
        let temper = CString::new("TEMPerV1.4").unwrap();
        let temper_hum = CString::new("TEMPerHUM").unwrap();

        let mut third = node(Some(&hidraw7), None, 0x413d, 0x2107, 2);
        let mut second = node(Some(&hidraw5), Some(&temper_hum), 0x0c45, 0x7401, 1);
        second.next = &mut third;
        let mut first = node(Some(&hidraw3), Some(&temper), 0x1a86, 0x5523, 0);
        first.next = &mut second;

        // SAFETY: every node and string outlives the call.
        let devices = unsafe { descriptors(NonNull::from(&mut first)) }.unwrap();

        let paths: Vec<&str> = devices.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["/dev/hidraw3", "/dev/hidraw5", "/dev/hidraw7"]);
        assert_eq!(devices[0].type_name, "TEMPerV1.4");
        assert_eq!(devices[1].vendor_id, 0x0c45);
        assert_eq!(devices[1].interface_number, 1);
        assert_eq!(devices[2].type_name, "");
        assert_eq!(devices[2].product_id, 0x2107);
    }

    #[test]
    fn test_descriptors_reject_non_utf8_path() {
        let path = CString::new(vec![b'/', b'd', 0xff]).unwrap();
        let mut head = node(Some(&path), None, 0x1a86, 0x5523, 0);

        // SAFETY: the node and its string outlive the call.
        let err = unsafe { descriptors(NonNull::from(&mut head)) }.unwrap_err();
        assert_eq!(err.message(), "path is not valid UTF-8");
    }

    #[test]
    fn test_negative_counts_clamp_to_zero() {
        assert_eq!(sensor_count_from(-1), 0);
        assert_eq!(sensor_count_from(3), 3);
        assert_eq!(mask_from(-1), SensorType::NONE);
        assert_eq!(mask_from(3), SensorType::TEMPERATURE | SensorType::HUMIDITY);
    }

    #[test]
    fn test_null_error_message() {
        // SAFETY: NULL is allowed.
        let err = unsafe { take_error(ptr::null_mut()) };
        assert_eq!(err.message(), "unknown error");
    }
}

//! Library handle
//!
//! Mirrors the native library's global init state and gates every call that
//! needs it. Devices borrow the handle, so the library cannot be torn down
//! while any of them is still alive.

use crate::device::Device;
use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::types::DeviceDescriptor;
use std::fmt;
use tracing::debug;

/// Process-wide handle on a native sensor library
///
/// Created uninitialised. Call [`Tempered::init`] before enumerating devices.
/// The native library's state is process-wide, so dropping a handle never
/// tears it down; call [`Tempered::exit`] for that.
pub struct Tempered<P: Provider> {
    provider: P,
    initialized: bool,
}

impl<P: Provider> Tempered<P> {
    /// Wrap a provider; nothing is called on it yet
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            initialized: false,
        }
    }

    /// Whether `init` has succeeded and `exit` has not since
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Get the underlying provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Initialise the native library
    ///
    /// No-op when already initialised. On failure the provider's message is
    /// returned as [`Error::Native`] and the handle stays uninitialised.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        self.provider.init()?;
        self.initialized = true;
        debug!("Initialised native sensor library");
        Ok(())
    }

    /// List attached devices in native enumeration order
    pub fn enumerate(&self) -> Result<Vec<DeviceDescriptor>> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        let devices = self.provider.enumerate()?;
        debug!("Enumerated {} devices", devices.len());
        Ok(devices)
    }

    /// Create a closed device handle for `descriptor`
    pub fn device(&self, descriptor: DeviceDescriptor) -> Device<'_, P> {
        Device::new(self, descriptor)
    }

    /// Enumerate and wrap every descriptor in a closed device handle
    pub fn devices(&self) -> Result<Vec<Device<'_, P>>> {
        Ok(self
            .enumerate()?
            .into_iter()
            .map(|descriptor| self.device(descriptor))
            .collect())
    }

    /// Create a device handle for `descriptor` and open it
    pub fn open(&self, descriptor: DeviceDescriptor) -> Result<Device<'_, P>> {
        let mut device = self.device(descriptor);
        device.open()?;
        Ok(device)
    }

    /// Tear down the native library
    ///
    /// No-op when not initialised. On failure the handle stays initialised,
    /// since the native teardown did not happen.
    pub fn exit(&mut self) -> Result<()> {
        if !self.initialized {
            return Ok(());
        }

        self.provider.exit()?;
        self.initialized = false;
        debug!("Shut down native sensor library");
        Ok(())
    }
}

impl<P: Provider> fmt::Debug for Tempered<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tempered")
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

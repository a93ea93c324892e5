//! Backend strategy
//! One interface, two implementations: the host bridge ([`HostBackend`]) and the
//! environment's built-in Bluetooth API ([`BrowserBackend`]). The facade picks one
//! at build time and never branches on the runtime mode again.
//!
//! [`HostBackend`]: crate::core::bluetooth::host::HostBackend
//! [`BrowserBackend`]: crate::core::bluetooth::native::BrowserBackend

use std::fmt;
use std::sync::Arc;

use crate::core::bluetooth::device::BluetoothDevice;
use crate::core::bluetooth::native::{BrowserDevice, NativeDevice};
use crate::core::bluetooth::types::{
    BluetoothServiceUUID, DeviceInfo, RequestDeviceOptions, WatchAdvertisementsOptions,
};
use crate::core::environment::RuntimeMode;
use crate::error::Result;

/// Top-level operations of `navigator.bluetooth`.
#[async_trait::async_trait]
pub trait BluetoothBackend: Send + Sync {
    fn mode(&self) -> RuntimeMode;

    /// Connectivity smoke test. Returns the echoed value, if any.
    async fn ping(&self, value: &str) -> Result<Option<String>>;

    async fn get_availability(&self) -> Result<bool>;

    /// Runs the device chooser. `Ok(None)` means no chooser exists.
    async fn request_device(&self, options: &RequestDeviceOptions)
    -> Result<Option<RequestedDevice>>;

    /// Binds constructor arguments to a device backend, rejecting arguments
    /// that do not belong to this mode.
    fn bind_device(&self, source: DeviceSource) -> Result<Arc<dyn DeviceBackend>>;
}

/// Per-device operations behind [`BluetoothDevice`] and its GATT server.
#[async_trait::async_trait]
pub trait DeviceBackend: Send + Sync {
    fn id(&self) -> String;

    fn name(&self) -> Option<String>;

    /// Whether a GATT server wrapper should be created for this device.
    fn has_gatt(&self) -> bool;

    async fn forget(&self) -> Result<()>;

    async fn watch_advertisements(&self, options: &WatchAdvertisementsOptions) -> Result<()>;

    /// Returns the host's acknowledgement of the connection.
    async fn gatt_connect(&self) -> Result<bool>;

    /// Live connection state, for backends that can read it synchronously.
    /// `None` leaves the GATT server wrapper to track acknowledgements itself.
    fn gatt_connected(&self) -> Option<bool>;

    /// Asks the backend for the current connection state.
    async fn query_gatt_connected(&self) -> Result<bool>;

    async fn gatt_disconnect(&self) -> Result<()>;

    /// Looks up a primary service and returns its identifier.
    async fn get_primary_service(&self, service: &BluetoothServiceUUID) -> Result<String>;
}

/// Constructor arguments for [`BluetoothDevice`].
#[derive(Clone)]
pub enum DeviceSource {
    /// `(id, name)` pair, valid in host mode.
    Descriptor { id: String, name: Option<String> },
    /// Device object from the built-in API, valid in browser mode.
    Native(Arc<dyn NativeDevice>),
}

impl DeviceSource {
    pub fn descriptor(id: impl Into<String>, name: Option<&str>) -> Self {
        DeviceSource::Descriptor {
            id: id.into(),
            name: name.map(str::to_string),
        }
    }
}

impl From<DeviceInfo> for DeviceSource {
    fn from(info: DeviceInfo) -> Self {
        DeviceSource::Descriptor {
            id: info.id,
            name: info.name,
        }
    }
}

impl From<Arc<dyn NativeDevice>> for DeviceSource {
    fn from(device: Arc<dyn NativeDevice>) -> Self {
        DeviceSource::Native(device)
    }
}

impl fmt::Debug for DeviceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSource::Descriptor { id, name } => f
                .debug_struct("Descriptor")
                .field("id", id)
                .field("name", name)
                .finish(),
            DeviceSource::Native(device) => f
                .debug_struct("Native")
                .field("id", &device.id())
                .field("name", &device.name())
                .finish(),
        }
    }
}

/// Result of a successful `request_device`.
pub enum RequestedDevice {
    /// Host mode: a wrapper built from the host's device descriptor.
    Bridged(BluetoothDevice),
    /// Browser mode: the built-in API's device, returned as is.
    Native(Arc<dyn NativeDevice>),
}

impl RequestedDevice {
    pub fn id(&self) -> String {
        match self {
            RequestedDevice::Bridged(device) => device.id(),
            RequestedDevice::Native(device) => device.id(),
        }
    }

    pub fn name(&self) -> Option<String> {
        match self {
            RequestedDevice::Bridged(device) => device.name(),
            RequestedDevice::Native(device) => device.name(),
        }
    }

    /// Wraps a native device so both modes can be driven through [`BluetoothDevice`].
    pub fn into_device(self) -> BluetoothDevice {
        match self {
            RequestedDevice::Bridged(device) => device,
            RequestedDevice::Native(device) => {
                BluetoothDevice::from_backend(Arc::new(BrowserDevice::new(device)))
            }
        }
    }
}

impl fmt::Debug for RequestedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            RequestedDevice::Bridged(_) => "Bridged",
            RequestedDevice::Native(_) => "Native",
        };
        f.debug_struct(kind)
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

//! Bluetooth bindings
//! This module exposes the Web Bluetooth-compatible surface and the two
//! backends behind it: the host bridge and the environment's built-in API.

mod backend;
mod capability;
mod commands;
mod constants;
mod device;
mod gatt;
mod host;
mod manager;
pub mod mock;
mod native;
mod types;

// Re-export types that should be publicly accessible
pub use backend::{BluetoothBackend, DeviceBackend, DeviceSource, RequestedDevice};
pub use capability::{
    BLUETOOTH_DEVICE, DEVICE_MEMBERS, GATT_SERVER, GATT_SERVER_MEMBERS, GATT_SERVICE,
    GATT_SERVICE_MEMBERS, Member, Support, members, support, supports,
};
pub use commands::{Forwarder, InvokeChannel};
pub use constants::*; // Re-export all constants
pub use device::{BluetoothDevice, GattServerDisconnectedHandler};
pub use gatt::{
    BluetoothRemoteGattCharacteristic, BluetoothRemoteGattServer, BluetoothRemoteGattService,
};
pub use host::{HostBackend, HostDevice};
pub use manager::{Bluetooth, BluetoothBuilder};
pub use native::{BrowserBackend, BrowserDevice, NativeBluetooth, NativeDevice, NativeGattServer};
pub use types::*;

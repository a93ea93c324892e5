//! Constants used throughout the bridge
//! Command names, the plugin namespace and UUID helpers shared by both backends.

use uuid::Uuid;

/// Namespace prepended to every command sent over the host invocation channel.
pub const INVOKE_PREFIX: &str = "plugin:bluetooth|";

/// Global flag the host bridge defines on the webview's global object.
pub const HOST_FLAG: &str = "isTauri";

/// Host command names
pub const CMD_PING: &str = "ping";
pub const CMD_GET_AVAILABILITY: &str = "get_availability";
pub const CMD_REQUEST_DEVICE: &str = "request_device";
pub const CMD_GATT_CONNECT: &str = "gatt_connect";
pub const CMD_GATT_CONNECTED: &str = "gatt_connected";
pub const CMD_GATT_DISCONNECT: &str = "gatt_disconnect";
pub const CMD_GET_SERVICE: &str = "get_service";
pub const CMD_DEVICE_FORGET: &str = "device_forget";
pub const CMD_WATCH_ADS: &str = "watch_ads";

/// Bluetooth base UUID, used to expand 16 and 32 bit aliases.
pub const BLUETOOTH_BASE_UUID: Uuid = Uuid::from_u128(0x00000000_0000_1000_8000_00805f9b34fb);

/// Expands a 16 or 32 bit alias against the Bluetooth base UUID.
pub fn uuid_from_u32(alias: u32) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID.as_u128() | ((alias as u128) << 96))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_battery_service_alias() {
        assert_eq!(
            uuid_from_u32(0x180f).hyphenated().to_string(),
            "0000180f-0000-1000-8000-00805f9b34fb"
        );
    }
}

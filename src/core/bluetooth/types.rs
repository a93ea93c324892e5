//! Defines the value shapes exchanged with the host and the native API.

use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::bluetooth::constants::uuid_from_u32;
use crate::error::{Error, Result};

/// Descriptor of a selected device, as returned by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Advertised service UUIDs
    #[serde(default)]
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingRequest {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingResponse {
    #[serde(default)]
    pub value: Option<String>,
}

/// A service UUID given either as a numeric alias or as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BluetoothServiceUUID {
    Number(u32),
    String(String),
}

impl BluetoothServiceUUID {
    /// Resolves the value to a full 128-bit UUID.
    ///
    /// Returns `None` for strings that are not UUIDs, such as GATT names
    /// (`"battery_service"`), which only the host knows how to resolve.
    pub fn to_uuid(&self) -> Option<Uuid> {
        match self {
            BluetoothServiceUUID::Number(alias) => Some(uuid_from_u32(*alias)),
            BluetoothServiceUUID::String(value) => Uuid::parse_str(value).ok(),
        }
    }
}

impl From<u32> for BluetoothServiceUUID {
    fn from(alias: u32) -> Self {
        BluetoothServiceUUID::Number(alias)
    }
}

impl From<&str> for BluetoothServiceUUID {
    fn from(value: &str) -> Self {
        BluetoothServiceUUID::String(value.to_string())
    }
}

impl From<Uuid> for BluetoothServiceUUID {
    fn from(uuid: Uuid) -> Self {
        BluetoothServiceUUID::String(uuid.hyphenated().to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BluetoothManufacturerDataFilter {
    pub company_identifier: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_prefix: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BluetoothServiceDataFilter {
    pub service: BluetoothServiceUUID,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_prefix: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Vec<u8>>,
}

/// Filter for a Bluetooth LE scan. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BluetoothLEScanFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<BluetoothServiceUUID>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer_data: Option<Vec<BluetoothManufacturerDataFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_data: Option<Vec<BluetoothServiceDataFilter>>,
}

impl BluetoothLEScanFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn by_services(services: Vec<BluetoothServiceUUID>) -> Self {
        Self {
            services: Some(services),
            ..Default::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.name_prefix.is_none()
            && self.services.is_none()
            && self.manufacturer_data.is_none()
            && self.service_data.is_none()
    }
}

/// Options for `request_device`. The optional `timeout` (milliseconds) is
/// passed to the host untouched and bounds its device scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDeviceOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<BluetoothLEScanFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_all_devices: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_services: Option<Vec<BluetoothServiceUUID>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_manufacturer_data: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl RequestDeviceOptions {
    pub fn with_filters(filters: Vec<BluetoothLEScanFilter>) -> Self {
        Self {
            filters: Some(filters),
            ..Default::default()
        }
    }

    pub fn accept_all_devices() -> Self {
        Self {
            accept_all_devices: Some(true),
            ..Default::default()
        }
    }

    pub fn timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }

    pub fn optional_services(mut self, services: Vec<BluetoothServiceUUID>) -> Self {
        self.optional_services = Some(services);
        self
    }

    /// Checks that exactly one of `filters` and `acceptAllDevices` selects devices.
    pub fn validate(&self) -> Result<()> {
        let accept_all = self.accept_all_devices.unwrap_or(false);
        match (&self.filters, accept_all) {
            (Some(_), true) => Err(Error::InvalidRequestDeviceOptions(
                "`filters` and `acceptAllDevices` are mutually exclusive".to_string(),
            )),
            (None, false) => Err(Error::InvalidRequestDeviceOptions(
                "either `filters` or `acceptAllDevices: true` is required".to_string(),
            )),
            (Some(filters), false) => {
                if filters.is_empty() {
                    return Err(Error::InvalidRequestDeviceOptions(
                        "`filters` must not be empty".to_string(),
                    ));
                }
                if filters.iter().any(BluetoothLEScanFilter::is_empty) {
                    return Err(Error::InvalidRequestDeviceOptions(
                        "a filter must specify at least one condition".to_string(),
                    ));
                }
                Ok(())
            }
            (None, true) => Ok(()),
        }
    }
}

/// Cancellation handle passed along with `watch_advertisements`.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the signal is aborted.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl From<CancellationToken> for AbortSignal {
    fn from(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Serialize for AbortSignal {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("AbortSignal", 1)?;
        state.serialize_field("aborted", &self.aborted())?;
        state.end()
    }
}

#[derive(Debug, Clone, Default)]
pub struct WatchAdvertisementsOptions {
    pub signal: Option<AbortSignal>,
}

impl WatchAdvertisementsOptions {
    pub fn with_signal(signal: AbortSignal) -> Self {
        Self {
            signal: Some(signal),
        }
    }
}

/// Characteristic UUIDs share the service UUID shape.
pub type BluetoothCharacteristicUUID = BluetoothServiceUUID;

/// A DOM-style event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
        }
    }
}

/// An advertisement report delivered to `onadvertisementreceived`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvertisingEvent {
    pub device_id: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
    pub tx_power: Option<i16>,
    #[serde(default)]
    pub uuids: Vec<String>,
}

pub type EventListener = Arc<dyn Fn(&Event) + Send + Sync>;
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;
pub type AdvertisementHandler = Arc<dyn Fn(&AdvertisingEvent) + Send + Sync>;

/// Arguments keyed by device id (`gatt_connect`, `gatt_disconnect`, `device_forget`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRequest<'a> {
    pub device_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PingArgs {
    pub payload: PingRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestDeviceArgs<'a> {
    pub options: &'a RequestDeviceOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceRequest<'a> {
    pub service: &'a BluetoothServiceUUID,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchAdvertisementsRequest<'a> {
    pub device_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<&'a AbortSignal>,
}

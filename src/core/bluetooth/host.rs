//! Host bridge backend
//! Every operation is forwarded to the native host as a namespaced command.

use std::sync::Arc;

use log::{debug, info};
use serde_json::Value;

use crate::core::bluetooth::backend::{
    BluetoothBackend, DeviceBackend, DeviceSource, RequestedDevice,
};
use crate::core::bluetooth::commands::Forwarder;
use crate::core::bluetooth::constants::{
    CMD_DEVICE_FORGET, CMD_GATT_CONNECT, CMD_GATT_CONNECTED, CMD_GATT_DISCONNECT,
    CMD_GET_AVAILABILITY, CMD_GET_SERVICE, CMD_PING, CMD_REQUEST_DEVICE, CMD_WATCH_ADS,
};
use crate::core::bluetooth::device::BluetoothDevice;
use crate::core::bluetooth::types::{
    BluetoothServiceUUID, DeviceInfo, DeviceRequest, PingArgs, PingRequest, PingResponse,
    RequestDeviceArgs, RequestDeviceOptions, ServiceRequest, WatchAdvertisementsOptions,
    WatchAdvertisementsRequest,
};
use crate::core::environment::RuntimeMode;
use crate::error::{Error, Result};

pub struct HostBackend {
    forwarder: Forwarder,
}

impl HostBackend {
    pub fn new(forwarder: Forwarder) -> Self {
        Self { forwarder }
    }

    fn device(&self, id: String, name: Option<String>) -> Arc<dyn DeviceBackend> {
        Arc::new(HostDevice {
            forwarder: self.forwarder.clone(),
            id,
            name,
        })
    }
}

#[async_trait::async_trait]
impl BluetoothBackend for HostBackend {
    fn mode(&self) -> RuntimeMode {
        RuntimeMode::Host
    }

    async fn ping(&self, value: &str) -> Result<Option<String>> {
        let args = PingArgs {
            payload: PingRequest {
                value: Some(value.to_string()),
            },
        };
        let response: PingResponse = self.forwarder.invoke(CMD_PING, &args).await?;
        // An empty echo counts as no echo.
        Ok(response.value.filter(|value| !value.is_empty()))
    }

    async fn get_availability(&self) -> Result<bool> {
        self.forwarder
            .invoke_without_args(CMD_GET_AVAILABILITY)
            .await
    }

    async fn request_device(
        &self,
        options: &RequestDeviceOptions,
    ) -> Result<Option<RequestedDevice>> {
        let info: DeviceInfo = self
            .forwarder
            .invoke(CMD_REQUEST_DEVICE, &RequestDeviceArgs { options })
            .await?;
        debug!("Host returned device descriptor: {:?}", info);

        let device = BluetoothDevice::from_backend(self.device(info.id, info.name));
        Ok(Some(RequestedDevice::Bridged(device)))
    }

    fn bind_device(&self, source: DeviceSource) -> Result<Arc<dyn DeviceBackend>> {
        match source {
            DeviceSource::Descriptor { id, name } => Ok(self.device(id, name)),
            DeviceSource::Native(_) => Err(Error::Type(
                "BluetoothDevice should pass \"id\" and \"name\" as arguments in host environment"
                    .to_string(),
            )),
        }
    }
}

/// Device known to the host by its id.
pub struct HostDevice {
    forwarder: Forwarder,
    id: String,
    name: Option<String>,
}

impl HostDevice {
    fn request(&self) -> DeviceRequest<'_> {
        DeviceRequest { device_id: &self.id }
    }

    /// Asks the host whether the device is still connected.
    pub async fn refresh_connected(&self) -> Result<bool> {
        let connected: bool = self
            .forwarder
            .invoke(CMD_GATT_CONNECTED, &self.request())
            .await?;
        debug!("Host reports device {} connected: {}", self.id, connected);
        Ok(connected)
    }
}

#[async_trait::async_trait]
impl DeviceBackend for HostDevice {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn has_gatt(&self) -> bool {
        true
    }

    async fn forget(&self) -> Result<()> {
        let _: Value = self
            .forwarder
            .invoke(CMD_DEVICE_FORGET, &self.request())
            .await?;
        info!("Device {} forgotten by host", self.id);
        Ok(())
    }

    async fn watch_advertisements(&self, options: &WatchAdvertisementsOptions) -> Result<()> {
        let request = WatchAdvertisementsRequest {
            device_id: &self.id,
            signal: options.signal.as_ref(),
        };
        let _: Value = self.forwarder.invoke(CMD_WATCH_ADS, &request).await?;
        Ok(())
    }

    async fn gatt_connect(&self) -> Result<bool> {
        // A host that acknowledges with `null` did not confirm the connection.
        let acknowledged: Option<bool> = self
            .forwarder
            .invoke(CMD_GATT_CONNECT, &self.request())
            .await?;
        Ok(acknowledged.unwrap_or(false))
    }

    fn gatt_connected(&self) -> Option<bool> {
        None
    }

    async fn query_gatt_connected(&self) -> Result<bool> {
        self.refresh_connected().await
    }

    async fn gatt_disconnect(&self) -> Result<()> {
        let _: Value = self
            .forwarder
            .invoke(CMD_GATT_DISCONNECT, &self.request())
            .await?;
        Ok(())
    }

    async fn get_primary_service(&self, service: &BluetoothServiceUUID) -> Result<String> {
        self.forwarder
            .invoke(CMD_GET_SERVICE, &ServiceRequest { service })
            .await
    }
}

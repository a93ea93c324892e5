//! Built-in Bluetooth API backend
//! Used when no host bridge is present. Calls are delegated one-to-one to the
//! environment's own `navigator.bluetooth` objects, modelled by the traits below.

use std::sync::Arc;

use log::{debug, warn};

use crate::core::bluetooth::backend::{
    BluetoothBackend, DeviceBackend, DeviceSource, RequestedDevice,
};
use crate::core::bluetooth::types::{
    BluetoothServiceUUID, RequestDeviceOptions, WatchAdvertisementsOptions,
};
use crate::core::environment::RuntimeMode;
use crate::error::{Error, NativeError, Result};

/// The environment's `navigator.bluetooth` object.
#[async_trait::async_trait]
pub trait NativeBluetooth: Send + Sync {
    async fn get_availability(&self) -> std::result::Result<bool, NativeError>;

    async fn request_device(
        &self,
        options: &RequestDeviceOptions,
    ) -> std::result::Result<Arc<dyn NativeDevice>, NativeError>;
}

/// A device object handed out by the built-in API.
#[async_trait::async_trait]
pub trait NativeDevice: Send + Sync {
    fn id(&self) -> String;

    fn name(&self) -> Option<String>;

    fn gatt(&self) -> Option<Arc<dyn NativeGattServer>>;

    async fn forget(&self) -> std::result::Result<(), NativeError>;

    async fn watch_advertisements(
        &self,
        options: &WatchAdvertisementsOptions,
    ) -> std::result::Result<(), NativeError>;
}

/// The built-in API's GATT server object.
#[async_trait::async_trait]
pub trait NativeGattServer: Send + Sync {
    fn connected(&self) -> bool;

    async fn connect(&self) -> std::result::Result<(), NativeError>;

    fn disconnect(&self);

    /// Returns the UUID of the matching primary service.
    async fn get_primary_service(
        &self,
        service: &BluetoothServiceUUID,
    ) -> std::result::Result<String, NativeError>;
}

pub struct BrowserBackend {
    native: Option<Arc<dyn NativeBluetooth>>,
}

impl BrowserBackend {
    /// `native` is `None` when the environment has no Bluetooth API at all.
    pub fn new(native: Option<Arc<dyn NativeBluetooth>>) -> Self {
        Self { native }
    }
}

#[async_trait::async_trait]
impl BluetoothBackend for BrowserBackend {
    fn mode(&self) -> RuntimeMode {
        RuntimeMode::Browser
    }

    async fn ping(&self, _value: &str) -> Result<Option<String>> {
        Err(Error::HostOnly("ping"))
    }

    async fn get_availability(&self) -> Result<bool> {
        match &self.native {
            Some(native) => Ok(native.get_availability().await?),
            None => {
                debug!("No built-in Bluetooth API, reporting unavailable");
                Ok(false)
            }
        }
    }

    async fn request_device(
        &self,
        options: &RequestDeviceOptions,
    ) -> Result<Option<RequestedDevice>> {
        let Some(native) = &self.native else {
            warn!("No built-in Bluetooth API, device request ignored");
            return Ok(None);
        };
        let device = native.request_device(options).await?;
        Ok(Some(RequestedDevice::Native(device)))
    }

    fn bind_device(&self, source: DeviceSource) -> Result<Arc<dyn DeviceBackend>> {
        match source {
            DeviceSource::Native(device) => Ok(Arc::new(BrowserDevice::new(device))),
            DeviceSource::Descriptor { .. } => Err(Error::Type(
                "BluetoothDevice should pass \"device\" as argument in browser environment"
                    .to_string(),
            )),
        }
    }
}

/// Adapts a native device object to [`DeviceBackend`].
pub struct BrowserDevice {
    device: Arc<dyn NativeDevice>,
}

impl BrowserDevice {
    pub fn new(device: Arc<dyn NativeDevice>) -> Self {
        Self { device }
    }

    fn gatt(&self) -> Result<Arc<dyn NativeGattServer>> {
        self.device.gatt().ok_or_else(|| {
            NativeError::new("NotSupportedError", "GATT server is not available").into()
        })
    }
}

#[async_trait::async_trait]
impl DeviceBackend for BrowserDevice {
    fn id(&self) -> String {
        self.device.id()
    }

    fn name(&self) -> Option<String> {
        self.device.name()
    }

    fn has_gatt(&self) -> bool {
        self.device.gatt().is_some()
    }

    async fn forget(&self) -> Result<()> {
        Ok(self.device.forget().await?)
    }

    async fn watch_advertisements(&self, options: &WatchAdvertisementsOptions) -> Result<()> {
        Ok(self.device.watch_advertisements(options).await?)
    }

    async fn gatt_connect(&self) -> Result<bool> {
        let gatt = self.gatt()?;
        gatt.connect().await?;
        Ok(gatt.connected())
    }

    fn gatt_connected(&self) -> Option<bool> {
        self.device.gatt().map(|gatt| gatt.connected())
    }

    async fn query_gatt_connected(&self) -> Result<bool> {
        Ok(self.gatt()?.connected())
    }

    async fn gatt_disconnect(&self) -> Result<()> {
        self.gatt()?.disconnect();
        Ok(())
    }

    async fn get_primary_service(&self, service: &BluetoothServiceUUID) -> Result<String> {
        Ok(self.gatt()?.get_primary_service(service).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bluetooth::mock::{MockNativeBluetooth, MockNativeDevice};

    #[tokio::test]
    async fn missing_api_is_unavailable() {
        let backend = BrowserBackend::new(None);
        assert!(!backend.get_availability().await.unwrap());
        assert!(
            backend
                .request_device(&RequestDeviceOptions::accept_all_devices())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn availability_is_delegated() {
        let native = Arc::new(MockNativeBluetooth::new(true));
        let backend = BrowserBackend::new(Some(native));
        assert!(backend.get_availability().await.unwrap());
    }

    #[tokio::test]
    async fn ping_requires_host() {
        let backend = BrowserBackend::new(None);
        assert!(matches!(
            backend.ping("hello").await,
            Err(Error::HostOnly("ping"))
        ));
    }

    #[tokio::test]
    async fn chooser_error_is_propagated() {
        let native = Arc::new(MockNativeBluetooth::new(true));
        let backend = BrowserBackend::new(Some(native));

        let result = backend
            .request_device(&RequestDeviceOptions::accept_all_devices())
            .await;

        match result {
            Err(Error::Native(err)) => assert_eq!(err.name, "NotFoundError"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn device_without_gatt_rejects_gatt_calls() {
        let device = BrowserDevice::new(Arc::new(MockNativeDevice::new("abc", None)));
        assert!(!device.has_gatt());
        assert!(matches!(device.gatt_connect().await, Err(Error::Native(_))));
    }
}

//! GATT server and service wrappers

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, info};
use uuid::Uuid;

use crate::core::bluetooth::backend::DeviceBackend;
use crate::core::bluetooth::capability::{self, GATT_SERVER, GATT_SERVICE};
use crate::core::bluetooth::device::{BluetoothDevice, DeviceShared};
use crate::core::bluetooth::types::{
    BluetoothCharacteristicUUID, BluetoothServiceUUID, Event, EventHandler, EventListener,
};
use crate::error::{Error, Result};

/// Mirrors `BluetoothRemoteGATTServer`.
///
/// In browser mode `connected` reads the native server. In host mode it reflects
/// the last acknowledged `connect`/`disconnect` or `refresh_connected`.
/// Concurrent calls are not serialised.
pub struct BluetoothRemoteGattServer {
    device: Weak<DeviceShared>,
    backend: Arc<dyn DeviceBackend>,
    connected: AtomicBool,
}

impl BluetoothRemoteGattServer {
    pub(crate) fn new(device: Weak<DeviceShared>, backend: Arc<dyn DeviceBackend>) -> Self {
        Self {
            device,
            backend,
            connected: AtomicBool::new(false),
        }
    }

    /// The owning device, or `None` once it has been dropped.
    pub fn device(&self) -> Option<BluetoothDevice> {
        self.device.upgrade().map(BluetoothDevice::from_shared)
    }

    pub fn connected(&self) -> bool {
        self.backend
            .gatt_connected()
            .unwrap_or_else(|| self.connected.load(Ordering::SeqCst))
    }

    /// Re-reads the connection state from the backend.
    pub async fn refresh_connected(&self) -> Result<bool> {
        let connected = self.backend.query_gatt_connected().await?;
        self.connected.store(connected, Ordering::SeqCst);
        Ok(connected)
    }

    /// Connects and returns `self` for chaining. `connected` only becomes
    /// `true` when the backend acknowledges the connection.
    pub async fn connect(&self) -> Result<&Self> {
        let id = self.backend.id();
        if self.backend.gatt_connect().await? {
            self.connected.store(true, Ordering::SeqCst);
            info!("GATT server connected for device {}", id);
        } else {
            debug!("GATT connect for device {} was not acknowledged", id);
        }
        Ok(self)
    }

    /// Disconnects and waits for the acknowledgement. Without a connection
    /// this returns immediately and nothing is sent.
    pub async fn disconnect(&self) -> Result<()> {
        if !self.connected() {
            debug!("GATT server for device {} is not connected", self.backend.id());
            return Ok(());
        }
        self.backend.gatt_disconnect().await?;
        self.connected.store(false, Ordering::SeqCst);
        info!("GATT server disconnected for device {}", self.backend.id());

        if let Some(device) = self.device() {
            device.fire_gatt_server_disconnected();
        }
        Ok(())
    }

    pub async fn get_primary_service(
        &self,
        service: impl Into<BluetoothServiceUUID>,
    ) -> Result<BluetoothRemoteGattService> {
        let uuid = self.backend.get_primary_service(&service.into()).await?;
        let device = self.device().ok_or(Error::DeviceReleased)?;
        Ok(BluetoothRemoteGattService::new(device, uuid))
    }

    pub fn get_primary_services(
        &self,
        _service: Option<BluetoothServiceUUID>,
    ) -> Result<Vec<BluetoothRemoteGattService>> {
        Err(capability::not_implemented(GATT_SERVER, "getPrimaryServices"))
    }
}

impl fmt::Debug for BluetoothRemoteGattServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BluetoothRemoteGattServer")
            .field("device_id", &self.backend.id())
            .field("connected", &self.connected())
            .finish()
    }
}

/// Mirrors `BluetoothRemoteGATTService`. Only the identity is implemented and
/// `is_primary` stays `false`.
#[derive(Debug, Clone)]
pub struct BluetoothRemoteGattService {
    device: BluetoothDevice,
    uuid: String,
    is_primary: bool,
}

impl BluetoothRemoteGattService {
    fn new(device: BluetoothDevice, uuid: String) -> Self {
        Self {
            device,
            uuid,
            is_primary: false,
        }
    }

    pub fn device(&self) -> &BluetoothDevice {
        &self.device
    }

    /// The identifier exactly as the backend returned it.
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    /// Parses `uuid()`, if it is a UUID.
    pub fn canonical_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.uuid).ok()
    }

    pub fn get_characteristic(
        &self,
        _characteristic: BluetoothCharacteristicUUID,
    ) -> Result<BluetoothRemoteGattCharacteristic> {
        Err(capability::not_implemented(GATT_SERVICE, "getCharacteristic"))
    }

    pub fn get_characteristics(
        &self,
        _characteristic: Option<BluetoothCharacteristicUUID>,
    ) -> Result<Vec<BluetoothRemoteGattCharacteristic>> {
        Err(capability::not_implemented(GATT_SERVICE, "getCharacteristics"))
    }

    pub fn get_included_service(
        &self,
        _service: BluetoothServiceUUID,
    ) -> Result<BluetoothRemoteGattService> {
        Err(capability::not_implemented(GATT_SERVICE, "getIncludedService"))
    }

    pub fn get_included_services(
        &self,
        _service: Option<BluetoothServiceUUID>,
    ) -> Result<Vec<BluetoothRemoteGattService>> {
        Err(capability::not_implemented(GATT_SERVICE, "getIncludedServices"))
    }

    pub fn add_event_listener(&self, _event_type: &str, _listener: EventListener) -> Result<()> {
        Err(capability::not_implemented(GATT_SERVICE, "addEventListener"))
    }

    pub fn remove_event_listener(
        &self,
        _event_type: &str,
        _listener: &EventListener,
    ) -> Result<()> {
        Err(capability::not_implemented(GATT_SERVICE, "removeEventListener"))
    }

    pub fn dispatch_event(&self, _event: &Event) -> Result<bool> {
        Err(capability::not_implemented(GATT_SERVICE, "dispatchEvent"))
    }

    pub fn set_on_characteristic_value_changed(&self, _handler: EventHandler) -> Result<()> {
        Err(capability::not_implemented(GATT_SERVICE, "oncharacteristicvaluechanged"))
    }

    pub fn set_on_service_added(&self, _handler: EventHandler) -> Result<()> {
        Err(capability::not_implemented(GATT_SERVICE, "onserviceadded"))
    }

    pub fn set_on_service_changed(&self, _handler: EventHandler) -> Result<()> {
        Err(capability::not_implemented(GATT_SERVICE, "onservicechanged"))
    }

    pub fn set_on_service_removed(&self, _handler: EventHandler) -> Result<()> {
        Err(capability::not_implemented(GATT_SERVICE, "onserviceremoved"))
    }
}

/// Declared for interface completeness; no operation yields one yet.
#[derive(Debug, Clone)]
pub struct BluetoothRemoteGattCharacteristic {
    service: BluetoothRemoteGattService,
    uuid: String,
}

impl BluetoothRemoteGattCharacteristic {
    pub fn service(&self) -> &BluetoothRemoteGattService {
        &self.service
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bluetooth::backend::DeviceSource;
    use crate::core::bluetooth::manager::Bluetooth;
    use crate::core::bluetooth::mock::{
        MockInvokeChannel, MockNativeBluetooth, MockNativeDevice, MockNativeGattServer,
    };
    use crate::core::bluetooth::native::{NativeDevice, NativeGattServer};
    use crate::core::environment::GlobalFlags;
    use crate::error::InvokeError;
    use serde_json::{Value, json};

    fn host_device(channel: &Arc<MockInvokeChannel>) -> BluetoothDevice {
        let bluetooth = Bluetooth::builder()
            .invoke_channel(channel.clone())
            .build(&GlobalFlags::host())
            .unwrap();
        BluetoothDevice::new(&bluetooth, DeviceSource::descriptor("abc", Some("Widget"))).unwrap()
    }

    #[tokio::test]
    async fn connect_sets_flag_when_acknowledged() {
        let channel = Arc::new(MockInvokeChannel::new());
        channel.respond("plugin:bluetooth|gatt_connect", json!(true));
        let device = host_device(&channel);
        let gatt = device.gatt().unwrap();

        let chained = gatt.connect().await.unwrap();

        assert!(chained.connected());
        assert!(gatt.connected());
        assert_eq!(
            channel.last_args("plugin:bluetooth|gatt_connect"),
            Some(json!({"deviceId": "abc"}))
        );
    }

    #[tokio::test]
    async fn connect_leaves_flag_when_refused() {
        let channel = Arc::new(MockInvokeChannel::new());
        channel.respond("plugin:bluetooth|gatt_connect", json!(false));
        let device = host_device(&channel);
        let gatt = device.gatt().unwrap();

        gatt.connect().await.unwrap();

        assert!(!gatt.connected());
    }

    #[tokio::test]
    async fn connect_error_is_propagated() {
        let channel = Arc::new(MockInvokeChannel::new());
        channel.reject(
            "plugin:bluetooth|gatt_connect",
            InvokeError::Transport("bridge closed".to_string()),
        );
        let device = host_device(&channel);
        let gatt = device.gatt().unwrap();

        assert!(matches!(
            gatt.connect().await,
            Err(Error::Invoke(InvokeError::Transport(_)))
        ));
        assert!(!gatt.connected());
    }

    #[tokio::test]
    async fn disconnect_without_connection_sends_nothing() {
        let channel = Arc::new(MockInvokeChannel::new());
        let device = host_device(&channel);
        let gatt = device.gatt().unwrap();

        gatt.disconnect().await.unwrap();

        assert!(!gatt.connected());
        assert_eq!(channel.call_count(), 0);
    }

    #[tokio::test]
    async fn disconnect_clears_flag_once_acknowledged() {
        let channel = Arc::new(MockInvokeChannel::new());
        channel.respond("plugin:bluetooth|gatt_connect", json!(true));
        channel.respond("plugin:bluetooth|gatt_disconnect", Value::Null);
        let device = host_device(&channel);
        let gatt = device.gatt().unwrap();

        gatt.connect().await.unwrap();
        gatt.disconnect().await.unwrap();

        assert!(!gatt.connected());
        assert_eq!(
            channel.last_args("plugin:bluetooth|gatt_disconnect"),
            Some(json!({"deviceId": "abc"}))
        );
    }

    #[tokio::test]
    async fn failed_disconnect_keeps_connection_flag() {
        let channel = Arc::new(MockInvokeChannel::new());
        channel.respond("plugin:bluetooth|gatt_connect", json!(true));
        channel.reject(
            "plugin:bluetooth|gatt_disconnect",
            InvokeError::Host("Device not found".to_string()),
        );
        let device = host_device(&channel);
        let gatt = device.gatt().unwrap();

        gatt.connect().await.unwrap();
        assert!(gatt.disconnect().await.is_err());
        assert!(gatt.connected());
    }

    #[tokio::test]
    async fn primary_service_is_tied_to_device() {
        let channel = Arc::new(MockInvokeChannel::new());
        channel.respond(
            "plugin:bluetooth|get_service",
            json!("0000180F-0000-1000-8000-00805F9B34FB"),
        );
        let device = host_device(&channel);

        let service = device
            .gatt()
            .unwrap()
            .get_primary_service("battery_service")
            .await
            .unwrap();

        assert_eq!(service.device(), &device);
        assert_eq!(service.uuid(), "0000180F-0000-1000-8000-00805F9B34FB");
        assert!(!service.is_primary());
        assert_eq!(
            service.canonical_uuid(),
            BluetoothServiceUUID::Number(0x180f).to_uuid()
        );
    }

    fn browser_device(server: &Arc<MockNativeGattServer>) -> BluetoothDevice {
        let native: Arc<dyn NativeDevice> =
            Arc::new(MockNativeDevice::new("native-1", None).with_gatt(server.clone()));
        let bluetooth = Bluetooth::builder()
            .native(Arc::new(MockNativeBluetooth::new(true)))
            .build(&GlobalFlags::browser())
            .unwrap();
        BluetoothDevice::new(&bluetooth, native).unwrap()
    }

    #[tokio::test]
    async fn refresh_connected_queries_host() {
        let channel = Arc::new(MockInvokeChannel::new());
        channel.respond("plugin:bluetooth|gatt_connect", json!(true));
        channel.respond("plugin:bluetooth|gatt_connected", json!(false));
        let device = host_device(&channel);
        let gatt = device.gatt().unwrap();

        gatt.connect().await.unwrap();
        assert!(gatt.connected());

        assert!(!gatt.refresh_connected().await.unwrap());
        assert!(!gatt.connected());
        assert_eq!(
            channel.last_args("plugin:bluetooth|gatt_connected"),
            Some(json!({"deviceId": "abc"}))
        );
    }

    #[tokio::test]
    async fn browser_connected_follows_native_server() {
        let server = Arc::new(MockNativeGattServer::new());
        let device = browser_device(&server);
        let gatt = device.gatt().unwrap();

        gatt.connect().await.unwrap();
        assert!(gatt.connected());

        server.disconnect();
        assert!(!gatt.connected());
    }

    #[tokio::test]
    async fn browser_disconnect_reaches_already_connected_server() {
        let server = Arc::new(MockNativeGattServer::new());
        server.connect().await.unwrap();
        let device = browser_device(&server);
        let gatt = device.gatt().unwrap();
        assert!(gatt.connected());

        gatt.disconnect().await.unwrap();

        assert!(!server.is_connected());
        assert!(!gatt.connected());
        assert!(gatt.refresh_connected().await.is_ok_and(|connected| !connected));
    }

    #[tokio::test]
    async fn browser_gatt_delegates_to_native_server() {
        let server = Arc::new(
            MockNativeGattServer::new().with_service("0000180d-0000-1000-8000-00805f9b34fb"),
        );
        let device = browser_device(&server);
        let gatt = device.gatt().unwrap();

        gatt.connect().await.unwrap();
        assert!(gatt.connected());
        assert!(server.is_connected());

        let service = gatt
            .get_primary_service(BluetoothServiceUUID::Number(0x180d))
            .await
            .unwrap();
        assert_eq!(service.uuid(), "0000180d-0000-1000-8000-00805f9b34fb");

        gatt.disconnect().await.unwrap();
        assert!(!gatt.connected());
        assert!(!server.is_connected());
    }
}

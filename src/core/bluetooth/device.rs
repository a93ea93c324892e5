//! Bluetooth device wrapper
//! Mirrors the standard `BluetoothDevice` interface on top of a [`DeviceBackend`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error};

use crate::core::bluetooth::backend::{DeviceBackend, DeviceSource};
use crate::core::bluetooth::capability::{self, BLUETOOTH_DEVICE};
use crate::core::bluetooth::gatt::BluetoothRemoteGattServer;
use crate::core::bluetooth::manager::Bluetooth;
use crate::core::bluetooth::types::{
    AdvertisementHandler, Event, EventHandler, EventListener, WatchAdvertisementsOptions,
};
use crate::error::Result;

/// Callback fired after the GATT server disconnects.
pub type GattServerDisconnectedHandler = Arc<dyn Fn(&BluetoothDevice) + Send + Sync>;

pub(crate) struct DeviceShared {
    backend: Arc<dyn DeviceBackend>,
    /// Set on the first `watch_advertisements` call and never cleared.
    watching_advertisements: AtomicBool,
    gatt: Option<BluetoothRemoteGattServer>,
    on_gatt_server_disconnected: Mutex<Option<GattServerDisconnectedHandler>>,
}

/// A selected Bluetooth device.
///
/// Cloning is cheap and every clone refers to the same device state.
#[derive(Clone)]
pub struct BluetoothDevice {
    inner: Arc<DeviceShared>,
}

impl BluetoothDevice {
    /// Creates a wrapper from constructor arguments.
    ///
    /// In host mode `source` must be an `(id, name)` descriptor, in browser mode a
    /// native device object. Anything else fails with [`Error::Type`].
    pub fn new(bluetooth: &Bluetooth, source: impl Into<DeviceSource>) -> Result<Self> {
        let backend = bluetooth.backend().bind_device(source.into())?;
        Ok(Self::from_backend(backend))
    }

    pub(crate) fn from_backend(backend: Arc<dyn DeviceBackend>) -> Self {
        let inner = Arc::new_cyclic(|device| {
            let gatt = backend
                .has_gatt()
                .then(|| BluetoothRemoteGattServer::new(device.clone(), backend.clone()));
            DeviceShared {
                backend,
                watching_advertisements: AtomicBool::new(false),
                gatt,
                on_gatt_server_disconnected: Mutex::new(None),
            }
        });
        Self { inner }
    }

    pub(crate) fn from_shared(inner: Arc<DeviceShared>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> String {
        self.inner.backend.id()
    }

    pub fn name(&self) -> Option<String> {
        self.inner.backend.name()
    }

    pub fn gatt(&self) -> Option<&BluetoothRemoteGattServer> {
        self.inner.gatt.as_ref()
    }

    pub async fn forget(&self) -> Result<()> {
        self.inner.backend.forget().await
    }

    /// Starts watching advertisements. Does nothing if already watching.
    ///
    /// The flag is raised on entry and stays raised after the call returns,
    /// whether it succeeded or not.
    pub async fn watch_advertisements(&self, options: WatchAdvertisementsOptions) -> Result<()> {
        if self
            .inner
            .watching_advertisements
            .swap(true, Ordering::SeqCst)
        {
            debug!("Device {} is already watching advertisements", self.id());
            return Ok(());
        }
        self.inner.backend.watch_advertisements(&options).await
    }

    pub fn watching_advertisements(&self) -> bool {
        self.inner.watching_advertisements.load(Ordering::SeqCst)
    }

    /// `ongattserverdisconnected`; `None` restores the default no-op.
    pub fn set_on_gatt_server_disconnected(&self, handler: Option<GattServerDisconnectedHandler>) {
        match self.inner.on_gatt_server_disconnected.lock() {
            Ok(mut slot) => *slot = handler,
            Err(e) => error!("Failed to set gattserverdisconnected handler: {}", e),
        }
    }

    pub(crate) fn fire_gatt_server_disconnected(&self) {
        let handler = match self.inner.on_gatt_server_disconnected.lock() {
            Ok(slot) => slot.clone(),
            Err(e) => {
                error!("Failed to read gattserverdisconnected handler: {}", e);
                None
            }
        };
        if let Some(handler) = handler {
            handler(self);
        }
    }

    pub fn add_event_listener(&self, _event_type: &str, _listener: EventListener) -> Result<()> {
        Err(capability::not_implemented(BLUETOOTH_DEVICE, "addEventListener"))
    }

    pub fn remove_event_listener(
        &self,
        _event_type: &str,
        _listener: &EventListener,
    ) -> Result<()> {
        Err(capability::not_implemented(BLUETOOTH_DEVICE, "removeEventListener"))
    }

    pub fn dispatch_event(&self, _event: &Event) -> Result<bool> {
        Err(capability::not_implemented(BLUETOOTH_DEVICE, "dispatchEvent"))
    }

    pub fn set_on_advertisement_received(&self, _handler: AdvertisementHandler) -> Result<()> {
        Err(capability::not_implemented(BLUETOOTH_DEVICE, "onadvertisementreceived"))
    }

    pub fn set_on_characteristic_value_changed(&self, _handler: EventHandler) -> Result<()> {
        Err(capability::not_implemented(BLUETOOTH_DEVICE, "oncharacteristicvaluechanged"))
    }

    pub fn set_on_service_added(&self, _handler: EventHandler) -> Result<()> {
        Err(capability::not_implemented(BLUETOOTH_DEVICE, "onserviceadded"))
    }

    pub fn set_on_service_changed(&self, _handler: EventHandler) -> Result<()> {
        Err(capability::not_implemented(BLUETOOTH_DEVICE, "onservicechanged"))
    }

    pub fn set_on_service_removed(&self, _handler: EventHandler) -> Result<()> {
        Err(capability::not_implemented(BLUETOOTH_DEVICE, "onserviceremoved"))
    }
}

impl fmt::Debug for BluetoothDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BluetoothDevice")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("watching_advertisements", &self.watching_advertisements())
            .finish()
    }
}

impl PartialEq for BluetoothDevice {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bluetooth::mock::{MockInvokeChannel, MockNativeDevice, MockNativeGattServer};
    use crate::core::bluetooth::native::NativeDevice;
    use crate::core::bluetooth::types::AbortSignal;
    use crate::core::environment::GlobalFlags;
    use crate::error::Error;
    use serde_json::{Value, json};
    use std::sync::atomic::AtomicUsize;

    fn host_bluetooth(channel: &Arc<MockInvokeChannel>) -> Bluetooth {
        Bluetooth::builder()
            .invoke_channel(channel.clone())
            .build(&GlobalFlags::host())
            .unwrap()
    }

    fn browser_bluetooth() -> Bluetooth {
        Bluetooth::builder().build(&GlobalFlags::browser()).unwrap()
    }

    fn host_device(channel: &Arc<MockInvokeChannel>) -> BluetoothDevice {
        BluetoothDevice::new(
            &host_bluetooth(channel),
            DeviceSource::descriptor("abc", None),
        )
        .unwrap()
    }

    fn native_device() -> Arc<dyn NativeDevice> {
        Arc::new(MockNativeDevice::new("native-1", Some("Heart Rate")))
    }

    #[test]
    fn host_mode_accepts_descriptor() {
        let channel = Arc::new(MockInvokeChannel::new());
        let device = BluetoothDevice::new(
            &host_bluetooth(&channel),
            DeviceSource::descriptor("abc", Some("Widget")),
        )
        .unwrap();

        assert_eq!(device.id(), "abc");
        assert_eq!(device.name().as_deref(), Some("Widget"));
        assert!(device.gatt().is_some());
        assert!(!device.watching_advertisements());
        assert_eq!(channel.call_count(), 0);
    }

    #[test]
    fn host_mode_rejects_native_device() {
        let channel = Arc::new(MockInvokeChannel::new());
        let result = BluetoothDevice::new(&host_bluetooth(&channel), native_device());
        assert!(matches!(result, Err(Error::Type(_))));
    }

    #[test]
    fn browser_mode_accepts_native_device() {
        let device = BluetoothDevice::new(&browser_bluetooth(), native_device()).unwrap();
        assert_eq!(device.id(), "native-1");
        assert_eq!(device.name().as_deref(), Some("Heart Rate"));
        // The mock has no GATT server unless one is attached.
        assert!(device.gatt().is_none());
    }

    #[test]
    fn browser_mode_rejects_descriptor() {
        let result =
            BluetoothDevice::new(&browser_bluetooth(), DeviceSource::descriptor("abc", None));
        match result {
            Err(Error::Type(message)) => assert!(message.contains("browser environment")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn browser_device_with_gatt_gets_server_wrapper() {
        let server = Arc::new(MockNativeGattServer::new());
        let native: Arc<dyn NativeDevice> =
            Arc::new(MockNativeDevice::new("native-1", None).with_gatt(server));
        let device = BluetoothDevice::new(&browser_bluetooth(), native).unwrap();
        let gatt = device.gatt().unwrap();
        assert_eq!(gatt.device(), Some(device.clone()));
    }

    #[tokio::test]
    async fn forget_forwards_device_id() {
        let channel = Arc::new(MockInvokeChannel::new());
        channel.respond("plugin:bluetooth|device_forget", Value::Null);
        let device = host_device(&channel);

        device.forget().await.unwrap();

        assert_eq!(
            channel.calls(),
            vec![(
                "plugin:bluetooth|device_forget".to_string(),
                Some(json!({"deviceId": "abc"}))
            )]
        );
    }

    #[tokio::test]
    async fn forget_delegates_to_native_device() {
        let native = Arc::new(MockNativeDevice::new("native-1", None));
        let device = BluetoothDevice::new(
            &browser_bluetooth(),
            native.clone() as Arc<dyn NativeDevice>,
        )
        .unwrap();

        device.forget().await.unwrap();

        assert_eq!(native.forget_calls(), 1);
    }

    #[tokio::test]
    async fn watch_advertisements_forwards_id_and_signal() {
        let channel = Arc::new(MockInvokeChannel::new());
        channel.respond("plugin:bluetooth|watch_ads", Value::Null);
        let device = host_device(&channel);

        let signal = AbortSignal::new();
        device
            .watch_advertisements(WatchAdvertisementsOptions::with_signal(signal))
            .await
            .unwrap();

        assert_eq!(
            channel.last_args("plugin:bluetooth|watch_ads"),
            Some(json!({"deviceId": "abc", "signal": {"aborted": false}}))
        );
    }

    // Known discrepancy, pending clarification of the intended semantics: the
    // watching flag is raised as a guard and never lowered, so once a watch has
    // completed (or failed) every later call is a silent no-op.
    #[tokio::test]
    async fn watching_flag_is_never_cleared() {
        let channel = Arc::new(MockInvokeChannel::new());
        channel.respond("plugin:bluetooth|watch_ads", Value::Null);
        let device = host_device(&channel);

        device
            .watch_advertisements(WatchAdvertisementsOptions::default())
            .await
            .unwrap();
        assert!(device.watching_advertisements());

        device
            .watch_advertisements(WatchAdvertisementsOptions::default())
            .await
            .unwrap();
        assert!(device.watching_advertisements());
        assert_eq!(channel.calls_to("plugin:bluetooth|watch_ads"), 1);
    }

    #[tokio::test]
    async fn watching_flag_stays_set_after_failure() {
        let channel = Arc::new(MockInvokeChannel::new());
        let device = host_device(&channel);

        // No scripted response, so the host rejects the command.
        assert!(
            device
                .watch_advertisements(WatchAdvertisementsOptions::default())
                .await
                .is_err()
        );
        assert!(device.watching_advertisements());
    }

    #[tokio::test]
    async fn browser_watch_is_delegated_once() {
        let native = Arc::new(MockNativeDevice::new("native-1", None));
        let device =
            BluetoothDevice::new(&browser_bluetooth(), native.clone() as Arc<dyn NativeDevice>)
                .unwrap();

        device
            .watch_advertisements(WatchAdvertisementsOptions::default())
            .await
            .unwrap();
        device
            .watch_advertisements(WatchAdvertisementsOptions::default())
            .await
            .unwrap();

        assert!(device.watching_advertisements());
        assert_eq!(native.watch_calls(), 1);
    }

    #[tokio::test]
    async fn browser_watch_with_aborted_signal_fails() {
        let native = Arc::new(MockNativeDevice::new("native-1", None));
        let device =
            BluetoothDevice::new(&browser_bluetooth(), native.clone() as Arc<dyn NativeDevice>)
                .unwrap();
        let signal = AbortSignal::new();
        signal.abort();

        let result = device
            .watch_advertisements(WatchAdvertisementsOptions::with_signal(signal))
            .await;

        match result {
            Err(Error::Native(error)) => assert_eq!(error.name, "AbortError"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(device.watching_advertisements());
        assert_eq!(native.watch_calls(), 1);
    }

    #[tokio::test]
    async fn gatt_server_disconnected_handler_fires_on_disconnect() {
        let channel = Arc::new(MockInvokeChannel::new());
        channel.respond("plugin:bluetooth|gatt_connect", json!(true));
        channel.respond("plugin:bluetooth|gatt_disconnect", Value::Null);
        let device = host_device(&channel);

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        device.set_on_gatt_server_disconnected(Some(Arc::new(move |device: &BluetoothDevice| {
            assert_eq!(device.id(), "abc");
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        let gatt = device.gatt().unwrap();
        gatt.connect().await.unwrap();
        gatt.disconnect().await.unwrap();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}

//! In-memory collaborators for tests and the demo binary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::core::bluetooth::commands::InvokeChannel;
use crate::core::bluetooth::constants::{
    CMD_DEVICE_FORGET, CMD_GATT_CONNECT, CMD_GATT_CONNECTED, CMD_GATT_DISCONNECT,
    CMD_GET_AVAILABILITY, CMD_GET_SERVICE, CMD_PING, CMD_REQUEST_DEVICE, CMD_WATCH_ADS,
};
use crate::core::bluetooth::native::{NativeBluetooth, NativeDevice, NativeGattServer};
use crate::core::bluetooth::types::{
    BluetoothServiceUUID, RequestDeviceOptions, WatchAdvertisementsOptions,
};
use crate::error::{InvokeError, NativeError};

type Handler = Arc<dyn Fn(Option<&Value>) -> Result<Value, InvokeError> + Send + Sync>;

/// A recorded invocation: full command name and arguments.
pub type Call = (String, Option<Value>);

/// Host channel with scripted replies. Every invocation is recorded; commands
/// without a scripted reply are rejected like an unknown host command.
#[derive(Default)]
pub struct MockInvokeChannel {
    handlers: Mutex<HashMap<String, Handler>>,
    calls: Mutex<Vec<Call>>,
}

impl MockInvokeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host with one Bluetooth peripheral, `prefix` being the command namespace.
    pub fn with_sample_data(prefix: &str) -> Self {
        let channel = Self::new();
        let name = |command: &str| format!("{}{}", prefix, command);

        channel.respond_with(&name(CMD_PING), |args| {
            Ok(json!({
                "value": args.and_then(|a| a.pointer("/payload/value")).cloned()
            }))
        });
        channel.respond(&name(CMD_GET_AVAILABILITY), json!(true));
        channel.respond(
            &name(CMD_REQUEST_DEVICE),
            json!({
                "id": "ZmE1YjNkNmMtNDJiMC00YTExLWE0MDgtZDk0NjNjN2YyZDhj",
                "name": "Perdix AI",
                "services": ["0000180f-0000-1000-8000-00805f9b34fb"]
            }),
        );
        channel.respond(&name(CMD_GATT_CONNECT), json!(true));
        channel.respond(&name(CMD_GATT_CONNECTED), json!(true));
        channel.respond(&name(CMD_GATT_DISCONNECT), Value::Null);
        channel.respond(
            &name(CMD_GET_SERVICE),
            json!("0000180f-0000-1000-8000-00805f9b34fb"),
        );
        channel.respond(&name(CMD_DEVICE_FORGET), Value::Null);
        channel.respond(&name(CMD_WATCH_ADS), Value::Null);
        channel
    }

    /// Replies to `command` with `value`, replacing any earlier script.
    pub fn respond(&self, command: &str, value: Value) {
        self.respond_with(command, move |_| Ok(value.clone()));
    }

    /// Rejects `command` with `error`.
    pub fn reject(&self, command: &str, error: InvokeError) {
        self.respond_with(command, move |_| Err(error.clone()));
    }

    /// Computes the reply to `command` from its arguments.
    pub fn respond_with<F>(&self, command: &str, handler: F)
    where
        F: Fn(Option<&Value>) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap()
            .insert(command.to_string(), Arc::new(handler));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, command: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == command)
            .count()
    }

    /// Arguments of the most recent call to `command`.
    pub fn last_args(&self, command: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _)| name == command)
            .and_then(|(_, args)| args.clone())
    }
}

#[async_trait::async_trait]
impl InvokeChannel for MockInvokeChannel {
    async fn invoke(&self, command: &str, args: Option<Value>) -> Result<Value, InvokeError> {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), args.clone()));

        let handler = self.handlers.lock().unwrap().get(command).cloned();
        match handler {
            Some(handler) => handler(args.as_ref()),
            None => Err(InvokeError::Host(format!("Command {} not found", command))),
        }
    }
}

/// Stand-in for `navigator.bluetooth`.
#[derive(Default)]
pub struct MockNativeBluetooth {
    available: bool,
    device: Option<Arc<MockNativeDevice>>,
    requests: Mutex<Vec<RequestDeviceOptions>>,
}

impl MockNativeBluetooth {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            ..Default::default()
        }
    }

    /// Device the chooser picks. Without one the chooser reports a cancellation.
    pub fn with_device(mut self, device: Arc<MockNativeDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_options(&self) -> Option<RequestDeviceOptions> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl NativeBluetooth for MockNativeBluetooth {
    async fn get_availability(&self) -> Result<bool, NativeError> {
        Ok(self.available)
    }

    async fn request_device(
        &self,
        options: &RequestDeviceOptions,
    ) -> Result<Arc<dyn NativeDevice>, NativeError> {
        self.requests.lock().unwrap().push(options.clone());
        match &self.device {
            Some(device) => Ok(device.clone() as Arc<dyn NativeDevice>),
            None => Err(NativeError::new(
                "NotFoundError",
                "User cancelled the requestDevice() chooser.",
            )),
        }
    }
}

/// Stand-in for a native `BluetoothDevice`.
pub struct MockNativeDevice {
    id: String,
    name: Option<String>,
    gatt: Option<Arc<MockNativeGattServer>>,
    forget_calls: AtomicUsize,
    watch_calls: AtomicUsize,
}

impl MockNativeDevice {
    pub fn new(id: &str, name: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.map(str::to_string),
            gatt: None,
            forget_calls: AtomicUsize::new(0),
            watch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_gatt(mut self, gatt: Arc<MockNativeGattServer>) -> Self {
        self.gatt = Some(gatt);
        self
    }

    pub fn forget_calls(&self) -> usize {
        self.forget_calls.load(Ordering::SeqCst)
    }

    pub fn watch_calls(&self) -> usize {
        self.watch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl NativeDevice for MockNativeDevice {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn gatt(&self) -> Option<Arc<dyn NativeGattServer>> {
        self.gatt
            .clone()
            .map(|gatt| gatt as Arc<dyn NativeGattServer>)
    }

    async fn forget(&self) -> Result<(), NativeError> {
        self.forget_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn watch_advertisements(
        &self,
        options: &WatchAdvertisementsOptions,
    ) -> Result<(), NativeError> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        if options.signal.as_ref().is_some_and(|signal| signal.aborted()) {
            return Err(NativeError::new("AbortError", "The operation was aborted."));
        }
        Ok(())
    }
}

/// Stand-in for a native GATT server exposing a fixed set of primary services.
#[derive(Default)]
pub struct MockNativeGattServer {
    connected: AtomicBool,
    services: Vec<String>,
}

impl MockNativeGattServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, uuid: &str) -> Self {
        self.services.push(uuid.to_string());
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl NativeGattServer for MockNativeGattServer {
    fn connected(&self) -> bool {
        self.is_connected()
    }

    async fn connect(&self) -> Result<(), NativeError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn get_primary_service(
        &self,
        service: &BluetoothServiceUUID,
    ) -> Result<String, NativeError> {
        if !self.is_connected() {
            return Err(NativeError::new("NetworkError", "GATT Server is disconnected."));
        }
        let wanted = service.to_uuid();
        self.services
            .iter()
            .find(|uuid| wanted.is_some() && uuid::Uuid::parse_str(uuid).ok() == wanted)
            .cloned()
            .ok_or_else(|| NativeError::new("NotFoundError", "No Services matching UUID found."))
    }
}

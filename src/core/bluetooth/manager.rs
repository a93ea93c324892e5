//! Bluetooth facade
//! This module provides the `navigator.bluetooth`-compatible entry point. The
//! backend is chosen once, when the facade is built.

use std::sync::Arc;

use log::{info, warn};

use crate::config::BridgeConfig;
use crate::core::bluetooth::backend::{BluetoothBackend, DeviceSource, RequestedDevice};
use crate::core::bluetooth::commands::{Forwarder, InvokeChannel};
use crate::core::bluetooth::device::BluetoothDevice;
use crate::core::bluetooth::host::HostBackend;
use crate::core::bluetooth::native::{BrowserBackend, NativeBluetooth};
use crate::core::bluetooth::types::RequestDeviceOptions;
use crate::core::environment::{GlobalScope, RuntimeMode};
use crate::error::{Error, Result};

/// Availability and device-request entry point.
#[derive(Clone)]
pub struct Bluetooth {
    backend: Arc<dyn BluetoothBackend>,
    config: BridgeConfig,
}

impl Bluetooth {
    pub fn builder() -> BluetoothBuilder {
        BluetoothBuilder::default()
    }

    pub fn mode(&self) -> RuntimeMode {
        self.backend.mode()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub(crate) fn backend(&self) -> &Arc<dyn BluetoothBackend> {
        &self.backend
    }

    /// Sends `value` to the host and returns the echo, or `None` if the host
    /// echoed nothing.
    pub async fn ping(&self, value: &str) -> Result<Option<String>> {
        self.backend.ping(value).await
    }

    pub async fn get_availability(&self) -> Result<bool> {
        self.backend.get_availability().await
    }

    /// Asks the user to pick a device.
    ///
    /// Resolves to `None` without contacting the chooser when Bluetooth is
    /// unavailable. In host mode the configured default timeout is merged into
    /// `options` when they carry none.
    pub async fn request_device(
        &self,
        mut options: RequestDeviceOptions,
    ) -> Result<Option<RequestedDevice>> {
        if !self.get_availability().await? {
            info!("Bluetooth is unavailable, device request skipped");
            return Ok(None);
        }

        options.validate()?;
        if self.mode().is_host() && options.timeout.is_none() {
            options.timeout = self.config.default_request_timeout_ms;
        }

        let device = self.backend.request_device(&options).await?;
        if let Some(device) = &device {
            info!("Obtained device: {:?}", device);
        }
        Ok(device)
    }

    /// Constructs a device wrapper, see [`BluetoothDevice::new`].
    pub fn device(&self, source: impl Into<DeviceSource>) -> Result<BluetoothDevice> {
        BluetoothDevice::new(self, source)
    }
}

/// Collects the collaborators each backend needs, then probes the environment.
#[derive(Default)]
pub struct BluetoothBuilder {
    config: BridgeConfig,
    invoke_channel: Option<Arc<dyn InvokeChannel>>,
    native: Option<Arc<dyn NativeBluetooth>>,
}

impl BluetoothBuilder {
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Channel to the host, required when the host flag is set.
    pub fn invoke_channel(mut self, channel: Arc<dyn InvokeChannel>) -> Self {
        self.invoke_channel = Some(channel);
        self
    }

    /// The environment's built-in Bluetooth API, if it has one.
    pub fn native(mut self, native: Arc<dyn NativeBluetooth>) -> Self {
        self.native = Some(native);
        self
    }

    pub fn build(self, scope: &dyn GlobalScope) -> Result<Bluetooth> {
        let mode = RuntimeMode::detect(scope, &self.config.host_flag);
        info!("Runtime mode detected: {:?}", mode);

        let backend: Arc<dyn BluetoothBackend> = match mode {
            RuntimeMode::Host => {
                let channel = self.invoke_channel.ok_or(Error::MissingInvokeChannel)?;
                let forwarder = Forwarder::with_prefix(channel, self.config.invoke_prefix.clone());
                Arc::new(HostBackend::new(forwarder))
            }
            RuntimeMode::Browser => {
                if self.native.is_none() {
                    warn!("No built-in Bluetooth API found, Bluetooth will report unavailable");
                }
                Arc::new(BrowserBackend::new(self.native))
            }
        };

        Ok(Bluetooth {
            backend,
            config: self.config,
        })
    }
}

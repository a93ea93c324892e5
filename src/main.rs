use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};
use web_bluetooth_bridge::mock::MockInvokeChannel;
use web_bluetooth_bridge::{
    Bluetooth, BluetoothServiceUUID, BridgeConfig, GlobalFlags, RequestDeviceOptions, logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let config = BridgeConfig::load_config(&config_dir)
        .await
        .with_context(|| format!("Failed to load config from {:?}", config_dir))?;
    logging::init(config.log_level());

    // Simulated host with one peripheral.
    let channel = Arc::new(MockInvokeChannel::with_sample_data(&config.invoke_prefix));
    let bluetooth = Bluetooth::builder()
        .config(config)
        .invoke_channel(channel.clone())
        .build(&GlobalFlags::host())?;

    info!("Ping: {:?}", bluetooth.ping("hello").await?);
    info!("Bluetooth available: {}", bluetooth.get_availability().await?);

    let requested = bluetooth
        .request_device(RequestDeviceOptions::accept_all_devices().timeout(5000))
        .await?;
    let Some(requested) = requested else {
        warn!("No device selected");
        return Ok(());
    };

    let device = requested.into_device();
    let gatt = device.gatt().context("Device has no GATT server")?;

    gatt.connect().await?;
    info!("Connected: {}", gatt.connected());

    let service = gatt
        .get_primary_service(BluetoothServiceUUID::Number(0x180f))
        .await?;
    info!("Primary service: {}", service.uuid());

    gatt.disconnect().await?;
    info!("Connected after disconnect: {}", gatt.connected());

    device.forget().await?;
    info!("{} host calls made", channel.call_count());
    Ok(())
}

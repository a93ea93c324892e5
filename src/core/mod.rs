//! Core functionality for the Web Bluetooth bridge
//! This module contains the environment probe and the Bluetooth bindings.

pub mod bluetooth;
pub mod environment;

// Re-export commonly used types
pub use bluetooth::{Bluetooth, BluetoothDevice};
pub use environment::{GlobalFlags, GlobalScope, RuntimeMode};

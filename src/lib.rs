//! Web Bluetooth bridge library
//! Guest-side bindings that forward Web Bluetooth calls to a native host
//! bridge, or to the environment's built-in API when no bridge is present.

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
mod utils;

pub use crate::core::bluetooth::*;
pub use crate::core::environment::{GlobalFlags, GlobalScope, RuntimeMode};
pub use config::BridgeConfig;
pub use error::{Error, InvokeError, NativeError, Result};

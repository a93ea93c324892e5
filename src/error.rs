//! Error types shared across the bridge.

use serde::{Serialize, Serializer};

pub type Result<T> = std::result::Result<T, Error>;

/// Rejection produced by the host invocation channel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvokeError {
    /// The host command ran and returned an error.
    #[error("{0}")]
    Host(String),
    /// The message never reached the host, or the reply was lost.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Exception raised by the environment's built-in Bluetooth API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{name}: {message}")]
pub struct NativeError {
    /// Exception name, e.g. `NotFoundError` or `SecurityError`.
    pub name: String,
    pub message: String,
}

impl NativeError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Wrapper constructed with arguments that do not fit the runtime mode.
    #[error("TypeError: {0}")]
    Type(String),
    #[error("{interface}.{member}: method not implemented")]
    NotImplemented {
        interface: &'static str,
        member: &'static str,
    },
    #[error(transparent)]
    Invoke(#[from] InvokeError),
    #[error(transparent)]
    Native(#[from] NativeError),
    #[error("Invalid request device options: {0}")]
    InvalidRequestDeviceOptions(String),
    #[error("Host bridge detected but no invoke channel was provided")]
    MissingInvokeChannel,
    #[error("Owning device has been released")]
    DeviceReleased,
    #[error("`{0}` is only available through the host bridge")]
    HostOnly(&'static str),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

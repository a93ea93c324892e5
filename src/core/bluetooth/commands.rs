//! Host command forwarding
//! This module relays named commands with JSON payloads to the native host.

use std::sync::Arc;

use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::bluetooth::constants::INVOKE_PREFIX;
use crate::error::{InvokeError, Result};

/// The host's generic named-command invocation channel.
#[async_trait::async_trait]
pub trait InvokeChannel: Send + Sync {
    /// Invoke `command` with optional arguments and return the host's reply.
    async fn invoke(
        &self,
        command: &str,
        args: Option<Value>,
    ) -> std::result::Result<Value, InvokeError>;
}

/// Prefixes command names with the plugin namespace and relays them to the host.
///
/// Rejections from the channel are returned unchanged. There is no retry and
/// no timeout of its own.
#[derive(Clone)]
pub struct Forwarder {
    channel: Arc<dyn InvokeChannel>,
    prefix: String,
}

impl Forwarder {
    pub fn new(channel: Arc<dyn InvokeChannel>) -> Self {
        Self::with_prefix(channel, INVOKE_PREFIX)
    }

    pub fn with_prefix(channel: Arc<dyn InvokeChannel>, prefix: impl Into<String>) -> Self {
        Self {
            channel,
            prefix: prefix.into(),
        }
    }

    /// Full command name as seen by the host.
    pub fn command_name(&self, command: &str) -> String {
        format!("{}{}", self.prefix, command)
    }

    /// Invoke `command` with `args` and decode the reply as `T`.
    pub async fn invoke<A, T>(&self, command: &str, args: &A) -> Result<T>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let args = serde_json::to_value(args)?;
        self.send(command, Some(args)).await
    }

    /// Invoke `command` without an argument object.
    pub async fn invoke_without_args<T>(&self, command: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.send(command, None).await
    }

    async fn send<T>(&self, command: &str, args: Option<Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let name = self.command_name(command);
        debug!("Invoking host command {} with {:?}", name, args);
        let response = self.channel.invoke(&name, args).await?;
        Ok(serde_json::from_value(response)?)
    }
}

//! Runtime environment probe
//! Decides whether the bindings run inside the native host bridge or in a plain
//! browser-like environment by reading a well-known global flag.

use std::collections::HashMap;

use crate::core::bluetooth::HOST_FLAG;

/// Read-only view of the global object the bindings are loaded into.
pub trait GlobalScope: Send + Sync {
    /// Returns the boolean value of a global flag, or `None` if it is not defined.
    fn flag(&self, name: &str) -> Option<bool>;
}

/// In-memory set of global flags.
#[derive(Debug, Clone, Default)]
pub struct GlobalFlags {
    flags: HashMap<String, bool>,
}

impl GlobalFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope of a webview running inside the host bridge.
    pub fn host() -> Self {
        Self::new().with_flag(HOST_FLAG, true)
    }

    /// Scope of a plain browser, where the host flag is never defined.
    pub fn browser() -> Self {
        Self::new()
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: bool) -> Self {
        self.flags.insert(name.into(), value);
        self
    }
}

impl GlobalScope for GlobalFlags {
    fn flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).copied()
    }
}

/// Which backend the bindings talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RuntimeMode {
    /// Commands are forwarded to the native host process.
    Host,
    /// Calls go to the environment's built-in Bluetooth API.
    Browser,
}

impl RuntimeMode {
    /// Probes `scope` for `flag_name`. An undefined flag counts as `false`.
    pub fn detect(scope: &dyn GlobalScope, flag_name: &str) -> Self {
        if scope.flag(flag_name).unwrap_or(false) {
            RuntimeMode::Host
        } else {
            RuntimeMode::Browser
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, RuntimeMode::Host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_host_when_flag_is_set() {
        assert_eq!(
            RuntimeMode::detect(&GlobalFlags::host(), HOST_FLAG),
            RuntimeMode::Host
        );
    }

    #[test]
    fn missing_or_false_flag_means_browser() {
        assert_eq!(
            RuntimeMode::detect(&GlobalFlags::browser(), HOST_FLAG),
            RuntimeMode::Browser
        );
        let scope = GlobalFlags::new().with_flag(HOST_FLAG, false);
        assert_eq!(RuntimeMode::detect(&scope, HOST_FLAG), RuntimeMode::Browser);
    }

    #[test]
    fn custom_flag_name() {
        let scope = GlobalFlags::new().with_flag("__BRIDGE__", true);
        assert!(RuntimeMode::detect(&scope, "__BRIDGE__").is_host());
        assert!(!RuntimeMode::detect(&scope, HOST_FLAG).is_host());
    }
}

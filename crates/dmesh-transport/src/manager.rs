//! Transport registry and dispatch.
//!
//! Holds every registered adapter, routes sends and receives by name,
//! and forwards inbound records and errors to the embedder's callbacks
//! tagged with the originating transport.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use dmesh_wire::{MessageEnvelope, WireRecord};

use crate::error::{Result, TransportError};
use crate::transport::Transport;

/// Callback for inbound records: `(transport_name, record)`.
pub type MessageCallback = Box<dyn Fn(&str, &WireRecord) + Send>;

/// Callback for transport failures: `(transport_name, error)`.
pub type ErrorCallback = Box<dyn Fn(&str, &TransportError) + Send>;

/// Manager configuration.
#[derive(Clone, Debug)]
pub struct TransportManagerConfig {
    /// Transport preference, best first, used by [`TransportManager::best_transport`].
    pub preference: Vec<String>,
}

impl Default for TransportManagerConfig {
    fn default() -> Self {
        Self {
            preference: vec!["clipboard".into(), "qr".into(), "file".into()],
        }
    }
}

/// Registry of transports plus embedder callbacks.
pub struct TransportManager {
    transports: BTreeMap<String, Box<dyn Transport + Send>>,
    config: TransportManagerConfig,
    on_message: Option<MessageCallback>,
    on_error: Option<ErrorCallback>,
}

impl TransportManager {
    /// Create an empty manager with the default preference order.
    pub fn new() -> Self {
        Self::with_config(TransportManagerConfig::default())
    }

    /// Create an empty manager with an explicit configuration.
    pub fn with_config(config: TransportManagerConfig) -> Self {
        Self {
            transports: BTreeMap::new(),
            config,
            on_message: None,
            on_error: None,
        }
    }

    /// Register a transport under its own name.
    pub fn register(&mut self, transport: Box<dyn Transport + Send>) {
        debug!(name = transport.name(), "transport registered");
        self.transports
            .insert(transport.name().to_string(), transport);
    }

    /// Set the inbound-record callback.
    pub fn on_message(&mut self, callback: MessageCallback) {
        self.on_message = Some(callback);
    }

    /// Set the error callback.
    pub fn on_error(&mut self, callback: ErrorCallback) {
        self.on_error = Some(callback);
    }

    /// Send an envelope via a named transport.
    pub fn send_via(&mut self, name: &str, envelope: &MessageEnvelope) -> Result<Vec<String>> {
        let transport = self
            .transports
            .get_mut(name)
            .ok_or_else(|| TransportError::Unavailable(name.to_string()))?;
        if !transport.is_available() {
            return Err(TransportError::Unavailable(name.to_string()));
        }
        transport.send(envelope)
    }

    /// Drain one named transport.
    pub fn receive_from(&mut self, name: &str) -> Result<Vec<WireRecord>> {
        let transport = self
            .transports
            .get_mut(name)
            .ok_or_else(|| TransportError::Unavailable(name.to_string()))?;
        transport.receive()
    }

    /// Poll every transport, dispatching records and errors to the
    /// registered callbacks. Returns all records collected.
    pub fn poll(&mut self) -> Vec<(String, WireRecord)> {
        let mut collected = Vec::new();
        for (name, transport) in &mut self.transports {
            match transport.receive() {
                Ok(records) => {
                    for record in records {
                        if let Some(callback) = &self.on_message {
                            callback(name, &record);
                        }
                        collected.push((name.clone(), record));
                    }
                }
                Err(e) => {
                    warn!(transport = name.as_str(), error = %e, "transport receive failed");
                    if let Some(callback) = &self.on_error {
                        callback(name, &e);
                    }
                }
            }
        }
        collected
    }

    /// Names of transports that are currently usable.
    pub fn available_transports(&self) -> Vec<&str> {
        self.transports
            .iter()
            .filter(|(_, t)| t.is_available())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// The best available transport per the configured preference.
    pub fn best_transport(&self) -> Option<&str> {
        for preferred in &self.config.preference {
            if let Some(t) = self.transports.get(preferred) {
                if t.is_available() {
                    return Some(preferred.as_str());
                }
            }
        }
        // Fall back to anything available but unranked.
        self.available_transports().into_iter().next()
    }
}

impl Default for TransportManager {
    fn default() -> Self {
        Self::new()
    }
}

//! Clipboard transport.
//!
//! One canonical JSON string per send; receive reads the host clipboard
//! and returns anything that parses as a message or identity. The host
//! clipboard itself is behind [`ClipboardHost`] so the core stays free
//! of OS APIs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use dmesh_wire::{MessageEnvelope, PublicIdentity, WireRecord};

use crate::error::{Result, TransportError};
use crate::transport::{Transport, TransportCapabilities};

/// Host hook for the system clipboard.
pub trait ClipboardHost {
    /// Read the clipboard, if it holds text.
    fn get_text(&self) -> Result<Option<String>>;

    /// Replace the clipboard contents.
    fn set_text(&self, text: &str) -> Result<()>;
}

/// An in-memory clipboard for tests and paired-node simulations.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClipboard {
    slots: Arc<Mutex<VecDeque<String>>>,
}

impl InMemoryClipboard {
    /// Create an empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardHost for InMemoryClipboard {
    fn get_text(&self) -> Result<Option<String>> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| TransportError::Io("clipboard lock poisoned".into()))?;
        Ok(slots.pop_front())
    }

    fn set_text(&self, text: &str) -> Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| TransportError::Io("clipboard lock poisoned".into()))?;
        slots.push_back(text.to_string());
        Ok(())
    }
}

/// The clipboard adapter.
pub struct ClipboardTransport<H: ClipboardHost> {
    host: H,
    listening: bool,
}

impl<H: ClipboardHost> ClipboardTransport<H> {
    /// Wrap a host clipboard.
    pub fn new(host: H) -> Self {
        Self {
            host,
            listening: false,
        }
    }

    /// Copy an identity card to the clipboard.
    pub fn send_identity(&mut self, identity: &PublicIdentity) -> Result<Vec<String>> {
        let json = identity.to_json();
        self.host.set_text(&json)?;
        Ok(vec![json])
    }
}

impl<H: ClipboardHost> Transport for ClipboardTransport<H> {
    fn name(&self) -> &'static str {
        "clipboard"
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            max_payload_size: usize::MAX,
            supports_chunking: false,
            bidirectional: true,
            realtime: false,
            offline: true,
            peer_discovery: false,
        }
    }

    fn send(&mut self, envelope: &MessageEnvelope) -> Result<Vec<String>> {
        let json = envelope.to_json();
        self.host.set_text(&json)?;
        Ok(vec![json])
    }

    fn receive(&mut self) -> Result<Vec<WireRecord>> {
        let Some(text) = self.host.get_text()? else {
            return Ok(Vec::new());
        };
        // Clipboards hold arbitrary text; non-records are not an error.
        match WireRecord::parse(&text) {
            Ok(record @ (WireRecord::Message(_) | WireRecord::Identity(_))) => Ok(vec![record]),
            Ok(_) | Err(_) => Ok(Vec::new()),
        }
    }

    fn start_listening(&mut self) -> Result<()> {
        self.listening = true;
        Ok(())
    }

    fn stop_listening(&mut self) -> Result<()> {
        self.listening = false;
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmesh_crypto::{create_public_identity, encrypt, BoxKeyPair, EncryptOptions, SigningKeyPair};

    fn sample_envelope() -> MessageEnvelope {
        let sign = SigningKeyPair::generate();
        let boxk = BoxKeyPair::generate();
        let recipient = BoxKeyPair::generate();
        encrypt(
            "hi",
            &sign,
            &boxk,
            &recipient.public_bytes(),
            EncryptOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_send_then_receive_round_trip() {
        let clipboard = InMemoryClipboard::new();
        let mut transport = ClipboardTransport::new(clipboard);

        let env = sample_envelope();
        let units = transport.send(&env).unwrap();
        assert_eq!(units.len(), 1);

        let received = transport.receive().unwrap();
        assert_eq!(received, vec![WireRecord::Message(env)]);
    }

    #[test]
    fn test_identity_round_trip() {
        let mut transport = ClipboardTransport::new(InMemoryClipboard::new());
        let id = create_public_identity("Alice", &[1; 32], &[2; 32]);
        transport.send_identity(&id).unwrap();

        let received = transport.receive().unwrap();
        assert_eq!(received, vec![WireRecord::Identity(id)]);
    }

    #[test]
    fn test_non_record_text_is_ignored() {
        let clipboard = InMemoryClipboard::new();
        clipboard.set_text("a grocery list").unwrap();
        let mut transport = ClipboardTransport::new(clipboard);
        assert!(transport.receive().unwrap().is_empty());
    }

    #[test]
    fn test_empty_clipboard_yields_nothing() {
        let mut transport = ClipboardTransport::new(InMemoryClipboard::new());
        assert!(transport.receive().unwrap().is_empty());
    }

    #[test]
    fn test_capabilities() {
        let transport = ClipboardTransport::new(InMemoryClipboard::new());
        let caps = transport.capabilities();
        assert!(caps.bidirectional);
        assert!(!caps.supports_chunking);
        assert!(transport.is_available());
    }
}

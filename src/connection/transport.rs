//! Transport seam and the in-process loopback transport.
//!
//! A transport is a full-duplex frame channel with WebSocket semantics. I/O
//! happens on the transport's own schedule; the session only observes it by
//! polling [`TransportEvent`]s once per tick.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use log::debug;
use parking_lot::Mutex;
use url::Url;

use super::error::TransportError;
use crate::protocol::{Message, PayloadRegistry, ProtocolError};

pub const HEADER_SESSION_ID: &str = "x-ms-mixed-reality-extension-sessionid";
pub const HEADER_PROTOCOL_VERSION: &str = "x-ms-mixed-reality-extension-protocol-version";
pub const HEADER_CLIENT_VERSION: &str = "x-ms-mixed-reality-extension-client-version";
pub const HEADER_MIN_SDK_VERSION: &str = "x-ms-mixed-reality-extension-min-sdk-version";

/// Headers negotiated when the transport is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectHeaders {
    pub session_id: String,
    /// Legacy protocol version, still sent for old apps.
    pub protocol_version: u32,
    pub client_version: String,
    pub min_sdk_version: String,
}

impl ConnectHeaders {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (HEADER_SESSION_ID, self.session_id.clone()),
            (HEADER_PROTOCOL_VERSION, self.protocol_version.to_string()),
            (HEADER_CLIENT_VERSION, self.client_version.clone()),
            (HEADER_MIN_SDK_VERSION, self.min_sdk_version.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Received(Frame),
    Error(String),
    Disconnected { reason: String },
}

pub trait Transport: Send {
    fn open(&mut self, url: &Url, headers: &ConnectHeaders) -> Result<(), TransportError>;
    fn send(&mut self, frame: Frame) -> Result<(), TransportError>;
    /// Next event since the last poll, if any.
    fn poll_event(&mut self) -> Option<TransportEvent>;
    fn close(&mut self);
    fn is_open(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Loopback
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SharedLoopbackState {
    open: AtomicBool,
    opens: Mutex<Vec<(Url, ConnectHeaders)>>,
    to_app: Mutex<VecDeque<Frame>>,
    to_client: Mutex<VecDeque<TransportEvent>>,
}

/// Client half of an in-memory transport. Opening always succeeds and
/// reports `Connected` on the next poll.
pub struct LoopbackTransport {
    state: Arc<SharedLoopbackState>,
}

/// App half of a [`LoopbackTransport`], driven by tests and local hosts.
#[derive(Clone)]
pub struct LoopbackPeer {
    state: Arc<SharedLoopbackState>,
}

impl LoopbackTransport {
    pub fn pair() -> (LoopbackTransport, LoopbackPeer) {
        let state = Arc::new(SharedLoopbackState::default());
        (
            LoopbackTransport {
                state: Arc::clone(&state),
            },
            LoopbackPeer { state },
        )
    }
}

impl Transport for LoopbackTransport {
    fn open(&mut self, url: &Url, headers: &ConnectHeaders) -> Result<(), TransportError> {
        if self.state.open.swap(true, Ordering::SeqCst) {
            return Err(TransportError::AlreadyOpen);
        }
        debug!("Loopback open {}", url);
        self.state.opens.lock().push((url.clone(), headers.clone()));
        self.state.to_client.lock().push_back(TransportEvent::Connected);
        Ok(())
    }

    fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        if !self.state.open.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.state.to_app.lock().push_back(frame);
        Ok(())
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.state.to_client.lock().pop_front()
    }

    fn close(&mut self) {
        if self.state.open.swap(false, Ordering::SeqCst) {
            debug!("Loopback closed");
        }
        self.state.to_client.lock().clear();
    }

    fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }
}

impl LoopbackPeer {
    /// Number of times the client opened the transport.
    pub fn open_count(&self) -> usize {
        self.state.opens.lock().len()
    }

    pub fn last_headers(&self) -> Option<ConnectHeaders> {
        self.state.opens.lock().last().map(|(_, h)| h.clone())
    }

    pub fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    pub fn send(&self, frame: Frame) {
        self.state
            .to_client
            .lock()
            .push_back(TransportEvent::Received(frame));
    }

    pub fn send_message(&self, message: &Message) -> Result<(), ProtocolError> {
        self.send(Frame::Text(message.encode()?));
        Ok(())
    }

    /// Everything the client sent since the last call.
    pub fn drain(&self) -> Vec<Frame> {
        self.state.to_app.lock().drain(..).collect()
    }

    /// Decode everything the client sent since the last call.
    pub fn drain_messages(&self, registry: &PayloadRegistry) -> Result<Vec<Message>, ProtocolError> {
        self.drain()
            .into_iter()
            .map(|frame| match frame {
                Frame::Text(text) => Message::decode(&text, registry),
                Frame::Binary(b) => Err(ProtocolError::BinaryFrame { len: b.len() }),
            })
            .collect()
    }

    pub fn fail(&self, reason: impl Into<String>) {
        self.state
            .to_client
            .lock()
            .push_back(TransportEvent::Error(reason.into()));
    }

    pub fn disconnect(&self, reason: impl Into<String>) {
        self.state.open.store(false, Ordering::SeqCst);
        self.state
            .to_client
            .lock()
            .push_back(TransportEvent::Disconnected {
                reason: reason.into(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::payloads::Heartbeat;

    fn headers() -> ConnectHeaders {
        ConnectHeaders {
            session_id: "S1".into(),
            protocol_version: 1,
            client_version: "0.1.0".into(),
            min_sdk_version: "0.13".into(),
        }
    }

    #[test]
    fn header_names() {
        let pairs = headers().to_pairs();
        assert_eq!(pairs[0], ("x-ms-mixed-reality-extension-sessionid", "S1".to_string()));
        assert_eq!(pairs[1].1, "1");
    }

    #[test]
    fn loopback_connects_and_carries_frames() {
        let (mut t, peer) = LoopbackTransport::pair();
        assert_eq!(t.send(Frame::Text("x".into())), Err(TransportError::NotConnected));

        let url = Url::parse("ws://localhost:3901/app").expect("url");
        t.open(&url, &headers()).expect("open");
        assert_eq!(t.poll_event(), Some(TransportEvent::Connected));
        assert_eq!(peer.last_headers(), Some(headers()));

        t.send(Frame::Text("hello".into())).expect("send");
        assert_eq!(peer.drain(), vec![Frame::Text("hello".into())]);

        peer.send_message(&Message::new(Heartbeat::default())).expect("encode");
        assert!(matches!(t.poll_event(), Some(TransportEvent::Received(Frame::Text(_)))));
    }

    #[test]
    fn peer_disconnect_closes_client() {
        let (mut t, peer) = LoopbackTransport::pair();
        let url = Url::parse("ws://localhost/app").expect("url");
        t.open(&url, &headers()).expect("open");
        peer.disconnect("gone");
        assert!(!t.is_open());
        assert_eq!(t.poll_event(), Some(TransportEvent::Connected));
        assert_eq!(
            t.poll_event(),
            Some(TransportEvent::Disconnected {
                reason: "gone".into()
            })
        );
    }
}

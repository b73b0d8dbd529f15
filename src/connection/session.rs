//! Session – one connection attempt at a time, from permission prompt to
//! execution.

use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use super::error::SessionError;
use super::manifest::{manifest_url, permission_origin, Manifest, ManifestLoader};
use super::permissions::{PermissionManager, Permissions};
use super::protocols::SubProtocol;
use super::transport::{ConnectHeaders, Frame, Transport, TransportEvent};
use crate::config::ClientConfig;
use crate::events::LifecycleEvent;
use crate::protocol::{
    Message, MessageHistory, OperatingModel, PayloadRegistry, ProtocolError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Stopped,
    WaitingForPermission,
    Starting,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Held until the execution phase starts.
    Queued,
}

/// Result of the manifest + permission task, tagged with the generation
/// that spawned it.
#[derive(Debug)]
struct PermissionResult {
    generation: u64,
    required: Permissions,
    granted: Permissions,
}

#[derive(Debug, Clone)]
struct Attempt {
    url: Url,
    session_id: String,
    origin: String,
}

fn transmit(transport: &mut dyn Transport, message: &Message) -> Result<(), SessionError> {
    let text = message.encode()?;
    debug!("→ {} ({})", message.tag(), message.id);
    transport.send(Frame::Text(text))?;
    Ok(())
}

pub struct Session {
    config: ClientConfig,
    registry: PayloadRegistry,
    transport: Box<dyn Transport>,
    manifest_loader: Arc<dyn ManifestLoader>,
    permission_manager: Arc<dyn PermissionManager>,

    state: SessionState,
    phase: SubProtocol,
    /// Bumped whenever the current attempt is abandoned.
    generation: u64,
    attempt: Option<Attempt>,
    /// Last attempt refused for missing permissions.
    denied: Option<Attempt>,
    granted: Permissions,
    operating_model: Option<OperatingModel>,
    remote_session_id: Option<String>,

    pending: Option<JoinHandle<()>>,
    results_tx: mpsc::UnboundedSender<PermissionResult>,
    results_rx: mpsc::UnboundedReceiver<PermissionResult>,

    history: MessageHistory,
    queued: VecDeque<Message>,
    inbound: VecDeque<Message>,
    events: Vec<LifecycleEvent>,
}

impl Session {
    pub fn new(
        config: ClientConfig,
        transport: impl Transport + 'static,
        manifest_loader: Arc<dyn ManifestLoader>,
        permission_manager: Arc<dyn PermissionManager>,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            config,
            registry: PayloadRegistry::with_core_payloads(),
            transport: Box::new(transport),
            manifest_loader,
            permission_manager,
            state: SessionState::Stopped,
            phase: SubProtocol::Idle,
            generation: 0,
            attempt: None,
            denied: None,
            granted: Permissions::empty(),
            operating_model: None,
            remote_session_id: None,
            pending: None,
            results_tx,
            results_rx,
            history: MessageHistory::new(),
            queued: VecDeque::new(),
            inbound: VecDeque::new(),
            events: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn phase(&self) -> SubProtocol {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Permissions granted for the current attempt.
    pub fn granted(&self) -> Permissions {
        self.granted
    }

    pub fn operating_model(&self) -> Option<OperatingModel> {
        self.operating_model
    }

    /// Session id the app confirmed in its handshake reply.
    pub fn remote_session_id(&self) -> Option<&str> {
        self.remote_session_id.as_deref()
    }

    pub fn registry(&self) -> &PayloadRegistry {
        &self.registry
    }

    /// For plugins registering extra payload types.
    pub fn registry_mut(&mut self) -> &mut PayloadRegistry {
        &mut self.registry
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Begin connecting to `url`. Any attempt in progress is shut down first.
    ///
    /// Must be called from within a tokio runtime; the manifest download
    /// and permission prompt run as a spawned task.
    pub fn startup(&mut self, url: &str, session_id: &str) -> Result<(), SessionError> {
        let url = Url::parse(url)?;
        let manifest_url = manifest_url(&url)?;
        let handle = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        if self.state != SessionState::Stopped {
            self.shutdown();
        }
        self.generation += 1;
        self.denied = None;

        let origin = permission_origin(&url);
        info!(
            "Session '{}' starting for {} (generation {})",
            session_id, origin, self.generation
        );

        let generation = self.generation;
        let loader = Arc::clone(&self.manifest_loader);
        let permissions = Arc::clone(&self.permission_manager);
        let tx = self.results_tx.clone();
        let task_origin = origin.clone();
        self.pending = Some(handle.spawn(async move {
            let manifest = match loader
                .load(manifest_url.clone())
                .await
                .and_then(|body| Manifest::parse(&body))
            {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!("Manifest {} unavailable, using defaults: {}", manifest_url, e);
                    Manifest::fallback()
                }
            };
            let required = manifest.required_permissions();
            let optional = manifest.optional_permissions();
            let granted = permissions.request(task_origin, required, optional).await;
            if tx
                .send(PermissionResult {
                    generation,
                    required,
                    granted,
                })
                .is_err()
            {
                debug!("Session dropped before permission result arrived");
            }
        }));

        self.attempt = Some(Attempt {
            url,
            session_id: session_id.to_string(),
            origin,
        });
        self.state = SessionState::WaitingForPermission;
        Ok(())
    }

    /// Tear everything down. Safe to call in any state; always fires
    /// `Shutdown`. A denied attempt stays eligible for
    /// [`Session::on_permission_changed`] until the next `startup`.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
            debug!("Cancelled pending permission request");
        }
        if self.transport.is_open() {
            self.transport.close();
        }
        self.generation += 1;
        self.state = SessionState::Stopped;
        self.phase = SubProtocol::Idle;
        self.attempt = None;
        self.granted = Permissions::empty();
        self.operating_model = None;
        self.remote_session_id = None;
        self.queued.clear();
        self.history.clear();
        info!("Session shut down");
        self.events.push(LifecycleEvent::Shutdown);
    }

    /// The host's permission decisions for `origin` changed. Retries the
    /// last denied attempt if it was for that origin.
    pub fn on_permission_changed(&mut self, origin: &str) -> Result<bool, SessionError> {
        let retry = match &self.denied {
            Some(attempt) if attempt.origin == origin && self.state == SessionState::Stopped => {
                attempt.clone()
            }
            _ => return Ok(false),
        };
        info!("Permissions for {} changed, reconnecting", origin);
        self.startup(retry.url.as_str(), &retry.session_id)?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Apply finished permission tasks and drain transport events.
    ///
    /// Stops at the first undecodable frame; later frames stay queued in the
    /// transport for the next call.
    pub fn update(&mut self) -> Result<(), SessionError> {
        while let Ok(result) = self.results_rx.try_recv() {
            self.apply_permission_result(result);
        }

        while let Some(event) = self.transport.poll_event() {
            match event {
                TransportEvent::Connected => self.on_connected()?,
                TransportEvent::Received(Frame::Text(text)) => {
                    let message = Message::decode(&text, &self.registry)?;
                    self.on_message(message)?;
                }
                TransportEvent::Received(Frame::Binary(bytes)) => {
                    return Err(ProtocolError::BinaryFrame { len: bytes.len() }.into());
                }
                TransportEvent::Error(reason) => {
                    warn!("Transport error: {}", reason);
                    self.reset(reason);
                }
                TransportEvent::Disconnected { reason } => {
                    warn!("Transport disconnected: {}", reason);
                    self.reset(reason);
                }
            }
        }
        Ok(())
    }

    /// Next message for the dispatcher, in receipt order.
    pub fn next_inbound(&mut self) -> Option<Message> {
        self.inbound.pop_front()
    }

    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    pub fn take_events(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Send now. Allowed once the handshake is done.
    pub fn send(&mut self, message: Message) -> Result<(), SessionError> {
        match self.phase {
            SubProtocol::Sync | SubProtocol::Execution => {
                transmit(self.transport.as_mut(), &message)
            }
            SubProtocol::Idle | SubProtocol::Handshake => Err(SessionError::NotRunning),
        }
    }

    /// Send now if executing, otherwise hold until execution starts.
    pub fn send_or_queue(&mut self, message: Message) -> Result<SendOutcome, SessionError> {
        if self.state == SessionState::Stopped {
            return Err(SessionError::Stopped);
        }
        if self.phase.is_execution() {
            transmit(self.transport.as_mut(), &message)?;
            Ok(SendOutcome::Sent)
        } else {
            debug!("Queueing '{}' until execution", message.tag());
            self.queued.push_back(message);
            Ok(SendOutcome::Queued)
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn apply_permission_result(&mut self, result: PermissionResult) {
        if result.generation != self.generation
            || self.state != SessionState::WaitingForPermission
        {
            warn!(
                "Discarding stale permission result (generation {}, current {})",
                result.generation, self.generation
            );
            return;
        }
        self.pending = None;
        let Some(attempt) = self.attempt.clone() else {
            return;
        };

        if !result.granted.contains(result.required) {
            let missing = result.required - result.granted;
            warn!("Permission denied for {}: missing {:?}", attempt.origin, missing);
            self.state = SessionState::Stopped;
            self.attempt = None;
            self.events.push(LifecycleEvent::PermissionDenied {
                origin: attempt.origin.clone(),
                missing,
            });
            self.denied = Some(attempt);
            return;
        }

        self.granted = result.granted;
        let headers = ConnectHeaders {
            session_id: attempt.session_id.clone(),
            protocol_version: self.config.protocol_version,
            client_version: self.config.client_version.clone(),
            min_sdk_version: self.config.min_sdk_version.clone(),
        };
        self.events.push(LifecycleEvent::Connecting {
            url: attempt.url.to_string(),
        });
        match self.transport.open(&attempt.url, &headers) {
            Ok(()) => {
                info!("Permissions granted ({:?}), connecting to {}", self.granted, attempt.url);
                self.state = SessionState::Starting;
            }
            Err(e) => {
                warn!("Failed to open transport: {}", e);
                self.reset(e.to_string());
            }
        }
    }

    fn on_connected(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Starting {
            warn!("Ignoring transport connect in state {:?}", self.state);
            return Ok(());
        }
        info!("Transport connected, starting handshake");
        self.events.push(LifecycleEvent::Connected);
        let (phase, hello) = SubProtocol::start();
        self.phase = phase;
        transmit(self.transport.as_mut(), &hello)
    }

    fn on_message(&mut self, message: Message) -> Result<(), SessionError> {
        if !self.history.insert(message.id) {
            warn!("Dropping duplicate message {} ('{}')", message.id, message.tag());
            return Ok(());
        }
        debug!("← {} ({})", message.tag(), message.id);

        let step = self.phase.handle(message);
        if let Some(reply) = &step.handshake {
            self.operating_model = Some(reply.operating_model);
            self.remote_session_id = Some(reply.session_id.clone());
        }
        for out in &step.send {
            transmit(self.transport.as_mut(), out)?;
        }
        if let Some(deliver) = step.deliver {
            self.inbound.push_back(deliver);
        }

        let entering_execution = step.next.is_execution() && !self.phase.is_execution();
        self.phase = step.next;
        if entering_execution {
            self.state = SessionState::Running;
            info!("Session running");
            self.events.push(LifecycleEvent::Running {
                operating_model: self.operating_model.unwrap_or_default(),
            });
            while let Some(queued) = self.queued.front() {
                transmit(self.transport.as_mut(), queued)?;
                self.queued.pop_front();
            }
        }
        Ok(())
    }

    /// Transport gone: back to idle, caller may retry `startup`.
    fn reset(&mut self, reason: String) {
        self.transport.close();
        self.generation += 1;
        self.state = SessionState::Stopped;
        self.phase = SubProtocol::Idle;
        self.attempt = None;
        self.queued.clear();
        self.history.clear();
        self.events.push(LifecycleEvent::Disconnected { reason });
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

//! Shared harness: an `MreApp` wired to a loopback transport, with the test
//! playing the remote app on the peer side.

#![allow(dead_code)]

use std::sync::Arc;

use mre_sync::app::TickReport;
use mre_sync::connection::{
    LoopbackPeer, LoopbackTransport, Permissions, StaticManifestLoader, StaticPermissionManager,
    SubProtocol,
};
use mre_sync::protocol::{HandshakeReply, OperatingModel, PayloadType, SyncComplete};
use mre_sync::scene::RecordingScene;
use mre_sync::{LifecycleEvent, Message, MreApp, MreConfig, PayloadRegistry};

pub const APP_URL: &str = "ws://apps.example.com:3901/garden?room=1";
pub const DT: f32 = 1.0 / 60.0;

pub struct Harness {
    pub app: MreApp,
    pub peer: LoopbackPeer,
    pub permissions: Arc<StaticPermissionManager>,
    pub registry: PayloadRegistry,
    /// Every lifecycle event delivered so far.
    pub events: Vec<LifecycleEvent>,
}

impl Harness {
    pub fn new(loader: StaticManifestLoader, granted: Permissions) -> Self {
        Self::with_config(MreConfig::default(), loader, granted)
    }

    pub fn with_config(
        config: MreConfig,
        loader: StaticManifestLoader,
        granted: Permissions,
    ) -> Self {
        let (transport, peer) = LoopbackTransport::pair();
        let permissions = Arc::new(StaticPermissionManager::new(granted));
        let app = MreApp::new(
            config,
            transport,
            Arc::new(loader),
            permissions.clone(),
            Box::<RecordingScene>::default(),
        );
        Self {
            app,
            peer,
            permissions,
            registry: PayloadRegistry::with_core_payloads(),
            events: Vec::new(),
        }
    }

    /// App that asks only for what every app needs.
    pub fn permissive() -> Self {
        Self::new(StaticManifestLoader::new("{}"), Permissions::all())
    }

    pub fn tick(&mut self) -> TickReport {
        let report = self.app.tick(DT).expect("tick");
        self.events.extend(report.events.iter().cloned());
        report
    }

    /// Tick, yielding to the runtime in between, until `done` holds.
    pub async fn pump_until(&mut self, done: impl Fn(&Harness) -> bool) -> bool {
        for _ in 0..50 {
            tokio::task::yield_now().await;
            self.tick();
            if done(&*self) {
                return true;
            }
        }
        false
    }

    /// Tick a fixed number of times.
    pub async fn pump(&mut self, ticks: usize) {
        for _ in 0..ticks {
            tokio::task::yield_now().await;
            self.tick();
        }
    }

    /// Messages the client sent since the last call.
    pub fn received(&self) -> Vec<Message> {
        self.peer.drain_messages(&self.registry).expect("decode")
    }

    pub fn received_tags(&self) -> Vec<&'static str> {
        self.received().iter().map(Message::tag).collect()
    }

    pub fn send<P: PayloadType>(&self, payload: P) -> Message {
        let message = Message::new(payload);
        self.peer.send_message(&message).expect("encode");
        message
    }

    pub fn phase(&self) -> SubProtocol {
        self.app.session().phase()
    }

    pub fn count_events(&self, matches: impl Fn(&LifecycleEvent) -> bool) -> usize {
        self.events.iter().filter(|e| matches(*e)).count()
    }

    /// Wait for the client's handshake and answer it. Leaves the session in
    /// the sync phase with the handshake traffic drained.
    pub async fn handshake(&mut self, model: OperatingModel) -> Vec<Message> {
        assert!(
            self.pump_until(|h| h.phase() == SubProtocol::Handshake).await,
            "client never started the handshake"
        );
        let hello = self.received();
        assert_eq!(hello.len(), 1);
        assert_eq!(hello[0].tag(), "handshake");

        self.send(HandshakeReply {
            session_id: "S1".into(),
            operating_model: model,
        });
        self.tick();
        assert_eq!(self.phase(), SubProtocol::Sync);
        self.received()
    }

    /// Connect all the way to the execution phase.
    pub async fn connect(&mut self, model: OperatingModel) {
        self.app.startup(APP_URL, "S1").expect("startup");
        self.handshake(model).await;
        self.send(SyncComplete::default());
        self.tick();
        assert_eq!(self.phase(), SubProtocol::Execution);
        self.received();
    }

    pub fn scene(&self) -> &RecordingScene {
        self.app
            .state()
            .scene
            .as_any()
            .downcast_ref::<RecordingScene>()
            .expect("recording scene")
    }
}

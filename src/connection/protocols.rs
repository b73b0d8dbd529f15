//! Wire sub-protocols.
//!
//! | Phase       | Accepts                          | Leaves on          |
//! |-------------|----------------------------------|--------------------|
//! | `Idle`      | nothing                          | transport connect  |
//! | `Handshake` | `handshake-reply`, `heartbeat`   | `handshake-reply`  |
//! | `Sync`      | everything (dispatched)          | `sync-complete`    |
//! | `Execution` | everything (dispatched)          | disconnect         |
//!
//! Heartbeats are answered in every phase and never dispatched.

use log::{debug, info, warn};

use crate::protocol::{
    Handshake, HandshakeComplete, HandshakeReply, Heartbeat, HeartbeatReply, Message,
    OperatingModel, SyncComplete, SyncRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubProtocol {
    #[default]
    Idle,
    Handshake,
    Sync,
    Execution,
}

/// What the session must do after one inbound message.
#[derive(Debug, Default)]
pub struct Step {
    pub next: SubProtocol,
    /// Sent in order before anything else this tick.
    pub send: Vec<Message>,
    /// Handed to the dispatcher.
    pub deliver: Option<Message>,
    pub handshake: Option<HandshakeReply>,
}

impl SubProtocol {
    /// Transport came up: begin the handshake.
    pub fn start() -> (SubProtocol, Message) {
        (SubProtocol::Handshake, Message::new(Handshake::default()))
    }

    pub fn is_execution(self) -> bool {
        self == SubProtocol::Execution
    }

    pub fn handle(self, message: Message) -> Step {
        let mut step = Step {
            next: self,
            ..Step::default()
        };

        if let Some(hb) = message.payload.downcast_ref::<Heartbeat>() {
            step.send.push(Message::reply(
                message.id,
                HeartbeatReply {
                    server_time: hb.server_time,
                },
            ));
            return step;
        }

        match self {
            SubProtocol::Idle => {
                warn!("Dropping '{}' received while idle", message.tag());
            }
            SubProtocol::Handshake => {
                match message.payload.downcast_ref::<HandshakeReply>() {
                    Some(reply) => {
                        info!(
                            "Handshake complete (session {}, {:?})",
                            reply.session_id, reply.operating_model
                        );
                        step.handshake = Some(reply.clone());
                        step.send
                            .push(Message::reply(message.id, HandshakeComplete::default()));
                        step.send.push(Message::new(SyncRequest::default()));
                        step.next = SubProtocol::Sync;
                    }
                    None => warn!("Dropping '{}' during handshake", message.tag()),
                }
            }
            SubProtocol::Sync => {
                if message.payload.is::<SyncComplete>() {
                    info!("Sync complete, entering execution");
                    step.next = SubProtocol::Execution;
                } else {
                    debug!("Sync delivering '{}'", message.tag());
                    step.deliver = Some(message);
                }
            }
            SubProtocol::Execution => {
                step.deliver = Some(message);
            }
        }
        step
    }
}

impl Step {
    pub fn operating_model(&self) -> Option<OperatingModel> {
        self.handshake.as_ref().map(|h| h.operating_model)
    }
}

//! ActorManager – live actors, pending-parent waitlist, outbound diffs.
//!
//! An actor whose parent has not arrived yet is *pending*: it is stored but
//! invisible to queries, and commands addressed to it are queued. When the
//! parent is created, the pending subtree becomes live in one step and the
//! queued commands are released in arrival order.

use std::collections::{HashMap, VecDeque};

use log::{debug, info, warn};

use super::Actor;
use crate::animation::{AnimationError, Track};
use crate::dispatch::OnComplete;
use crate::patch::{generate, ActorPatch, Patchable, Restorable};
use crate::protocol::Payload;
use crate::types::{ActorId, Transform};

/// A dispatchable command addressed to one actor.
pub struct ActorCommand<S> {
    pub payload: Box<dyn Payload>,
    pub on_complete: Option<OnComplete<S>>,
}

impl<S> ActorCommand<S> {
    pub fn new(payload: Box<dyn Payload>, on_complete: Option<OnComplete<S>>) -> Self {
        Self {
            payload,
            on_complete,
        }
    }
}

pub enum CommandStatus<S> {
    /// The actor is placed (or unknown); dispatch the command now.
    Ready(ActorCommand<S>),
    /// The actor is pending; the command runs once it is placed.
    Queued,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// These actors became live, the created actor first.
    Created(Vec<ActorId>),
    /// Stored as pending until `waiting_on` exists.
    Pending { waiting_on: ActorId },
    /// An actor with this id already exists; nothing changed.
    Duplicate,
}

pub struct ActorManager<S> {
    live: HashMap<ActorId, Actor>,
    pending: HashMap<ActorId, Actor>,
    /// parent id → pending children waiting for it
    waiting: HashMap<ActorId, Vec<ActorId>>,
    queued: HashMap<ActorId, VecDeque<ActorCommand<S>>>,
    ready: VecDeque<ActorCommand<S>>,
    /// Last state sent to (or received from) the app, per actor.
    emitted: HashMap<ActorId, Actor>,
}

impl<S> ActorManager<S> {
    pub fn new() -> Self {
        Self {
            live: HashMap::new(),
            pending: HashMap::new(),
            waiting: HashMap::new(),
            queued: HashMap::new(),
            ready: VecDeque::new(),
            emitted: HashMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Live actor by id. Pending actors are not visible.
    pub fn find(&self, id: ActorId) -> Option<&Actor> {
        self.live.get(&id)
    }

    pub fn find_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.live.get_mut(&id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Actor> {
        self.live.values().find(|a| a.name == name)
    }

    pub fn is_pending(&self, id: ActorId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.live.values()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    pub fn create_actor(&mut self, patch: &ActorPatch) -> CreateOutcome {
        let id = patch.id;
        if self.live.contains_key(&id) || self.pending.contains_key(&id) {
            warn!("Duplicate create for actor {}", id);
            return CreateOutcome::Duplicate;
        }

        let actor = Actor::from_patch(patch);
        if let Some(parent) = actor.parent_id {
            if !self.live.contains_key(&parent) {
                debug!("Actor {} pending on parent {}", id, parent);
                self.pending.insert(id, actor);
                self.waiting.entry(parent).or_default().push(id);
                return CreateOutcome::Pending { waiting_on: parent };
            }
        }

        self.place(actor);
        let mut created = vec![id];
        let mut frontier = vec![id];
        while let Some(parent) = frontier.pop() {
            for child in self.waiting.remove(&parent).unwrap_or_default() {
                if let Some(actor) = self.pending.remove(&child) {
                    self.place(actor);
                    created.push(child);
                    frontier.push(child);
                }
            }
        }
        if created.len() > 1 {
            info!(
                "Actor {} resolved {} pending descendants",
                id,
                created.len() - 1
            );
        }
        CreateOutcome::Created(created)
    }

    fn place(&mut self, actor: Actor) {
        let id = actor.id;
        if let Some(queue) = self.queued.remove(&id) {
            self.ready.extend(queue);
        }
        self.emitted.insert(id, actor.clone());
        self.live.insert(id, actor);
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Queue `command` if actor `id` is pending, else hand it back to run now.
    pub fn process_actor_command(&mut self, id: ActorId, command: ActorCommand<S>) -> CommandStatus<S> {
        if self.pending.contains_key(&id) {
            debug!("Queued '{}' for pending actor {}", command.payload.tag(), id);
            self.queued.entry(id).or_default().push_back(command);
            CommandStatus::Queued
        } else {
            CommandStatus::Ready(command)
        }
    }

    /// Commands released by actors that became live, oldest first.
    pub fn take_ready_commands(&mut self) -> Vec<ActorCommand<S>> {
        self.ready.drain(..).collect()
    }

    /// Apply an update from the app. The app already knows this state, so
    /// it is not echoed back by [`collect_outbound_patches`](Self::collect_outbound_patches).
    pub fn update_actor(&mut self, patch: &ActorPatch) -> bool {
        let Some(actor) = self.live.get_mut(&patch.id) else {
            warn!("Update for unknown actor {}", patch.id);
            return false;
        };
        actor.apply_patch(patch);
        if let Some(emitted) = self.emitted.get_mut(&patch.id) {
            emitted.apply_patch(patch);
        }
        true
    }

    /// App-space pose written back by the local simulation. Not reported
    /// as an actor update; poses travel through the physics channel.
    pub fn set_simulated_pose(&mut self, id: ActorId, pose: Transform) -> bool {
        let Some(actor) = self.live.get_mut(&id) else {
            return false;
        };
        actor.transform.app = pose;
        if let Some(emitted) = self.emitted.get_mut(&id) {
            emitted.transform.app = pose;
        }
        true
    }

    /// Patches for every live actor changed locally since the last call.
    pub fn collect_outbound_patches(&mut self) -> Vec<ActorPatch> {
        let mut patches = Vec::new();
        for (id, actor) in &self.live {
            if let Some(patch) = generate(self.emitted.get(id), actor) {
                patches.push(patch);
                self.emitted.insert(*id, actor.clone());
            }
        }
        patches
    }

    /// Sample `track` at `time` into the actor its target names.
    ///
    /// Returns the patch that was applied, or `None` if no live actor has
    /// that name.
    pub fn apply_track(&mut self, track: &Track, time: f32) -> Result<Option<ActorPatch>, AnimationError> {
        let target = track.target();
        if target.kind != "actor" {
            return Ok(None);
        }
        let Some(actor) = self.live.values_mut().find(|a| a.name == target.name) else {
            return Ok(None);
        };
        let reference = if track.is_relative() {
            actor.to_full_patch().read(&target.path)
        } else {
            None
        };
        let mut patch = ActorPatch::for_actor(actor.id);
        track.apply(time, reference.as_ref(), &mut patch)?;
        actor.apply_patch(&patch);
        Ok(Some(patch))
    }

    // -----------------------------------------------------------------------
    // Destruction
    // -----------------------------------------------------------------------

    /// Destroy `id` and all of its descendants, live or pending.
    ///
    /// Returns `true` if any actor existed.
    pub fn on_actor_destroy(&mut self, id: ActorId) -> bool {
        !self.destroy_subtree(id).is_empty()
    }

    /// Destroy `id` and its descendants, returning every removed id.
    pub fn destroy_subtree(&mut self, id: ActorId) -> Vec<ActorId> {
        let mut removed = Vec::new();
        let mut frontier = vec![id];
        while let Some(current) = frontier.pop() {
            let existed =
                self.live.remove(&current).is_some() || self.pending.remove(&current).is_some();
            self.emitted.remove(&current);
            self.queued.remove(&current);
            if existed {
                removed.push(current);
            }
            self.waiting.remove(&current);
            frontier.extend(
                self.live
                    .values()
                    .chain(self.pending.values())
                    .filter(|a| a.parent_id == Some(current))
                    .map(|a| a.id),
            );
        }
        for children in self.waiting.values_mut() {
            children.retain(|c| !removed.contains(c));
        }
        self.waiting.retain(|_, children| !children.is_empty());
        if !removed.is_empty() {
            debug!("Destroyed {} actor(s) under {}", removed.len(), id);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.pending.clear();
        self.waiting.clear();
        self.queued.clear();
        self.ready.clear();
        self.emitted.clear();
    }
}

impl<S> Default for ActorManager<S> {
    fn default() -> Self {
        Self::new()
    }
}

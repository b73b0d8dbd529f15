//! MreApp – owns the session, the entity managers and the tick.
//!
//! ## Tick order
//!
//! | Phase | Work                                                             |
//! |-------|------------------------------------------------------------------|
//! | (a)   | permission results, transport events, inbound decode, held joins |
//! | (b)   | dispatch inbound commands in receipt order; handler replies sent |
//! | (c)   | physics: snapshot playback and ownership prediction              |
//! | (d)   | outbound actor patches and owned-body transforms                 |
//!
//! Lifecycle events gathered during the tick are delivered to observers at
//! its end, even when the tick fails.

use std::sync::Arc;

use log::{debug, error, info, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::actor::{ActorCommand, ActorManager, CommandStatus, CreateOutcome};
use crate::asset::AssetManager;
use crate::config::MreConfig;
use crate::connection::{
    ManifestLoader, PermissionManager, Permissions, SendOutcome, Session, SessionError,
    SessionState, Transport,
};
use crate::dispatch::{CommandDispatcher, DispatchError, OnComplete};
use crate::events::{EventQueue, LifecycleEvent, ObserverError};
use crate::patch::{ActorPatch, ColliderGeometry, Patchable};
use crate::physics::{BodyState, PhysicsBridge};
use crate::protocol::{
    ActorCorrection, ActorUpdate, AssetUpdate, CreateActor, CreateAsset, DestroyActors, Message,
    ObjectSpawned, OperatingModel, OperationResult, PayloadType, PhysicsBridgeUpdate, ResultCode,
    SetBehavior, Trace, TraceSeverity, UserJoined, UserLeft, UserUpdate, ACTORS_CONTEXT,
    APP_CONTEXT, ASSETS_CONTEXT, PHYSICS_CONTEXT, USERS_CONTEXT,
};
use crate::scene::SceneRoot;
use crate::types::{ActorId, SyncStats, Transform, UserId, Vec3};
use crate::user::{obfuscate_user_id, User, UserError, UserManager};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    User(#[from] UserError),
}

/// What one [`MreApp::tick`] did.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    /// Commands handled this tick.
    pub dispatched: usize,
    /// Commands held for actors still waiting on their parent.
    pub deferred: usize,
    /// Messages sent in the outbound phase.
    pub outbound: usize,
    /// Lifecycle events delivered to observers.
    pub events: Vec<LifecycleEvent>,
}

// ---------------------------------------------------------------------------
// SyncState
// ---------------------------------------------------------------------------

/// Everything handlers mutate.
pub struct SyncState {
    pub actors: ActorManager<SyncState>,
    pub users: UserManager,
    pub assets: AssetManager,
    pub physics: PhysicsBridge,
    pub scene: Box<dyn SceneRoot>,
    /// Replies produced by handlers, sent after each command.
    outbox: Vec<Message>,
    spawned: Vec<ActorPatch>,
    spawn_result: OperationResult,
}

impl SyncState {
    fn new(config: &MreConfig, scene: Box<dyn SceneRoot>) -> Self {
        Self {
            actors: ActorManager::new(),
            users: UserManager::new(),
            assets: AssetManager::new(),
            physics: PhysicsBridge::new(config.prediction.clone()),
            scene,
            outbox: Vec::new(),
            spawned: Vec::new(),
            spawn_result: OperationResult::success(),
        }
    }

    // -----------------------------------------------------------------------
    // Actors
    // -----------------------------------------------------------------------

    fn on_create_actor(&mut self, p: CreateActor) -> Result<(), DispatchError> {
        self.spawned.clear();
        self.spawn_result = match self.actors.create_actor(&p.actor) {
            CreateOutcome::Created(ids) => {
                for id in ids {
                    self.on_actor_placed(id);
                }
                OperationResult::success()
            }
            CreateOutcome::Pending { waiting_on } => OperationResult {
                result_code: ResultCode::Warning,
                message: format!("waiting for parent {waiting_on}"),
            },
            CreateOutcome::Duplicate => {
                OperationResult::error(format!("actor {} already exists", p.actor.id))
            }
        };
        Ok(())
    }

    fn on_actor_placed(&mut self, id: ActorId) {
        if let Some(actor) = self.actors.find(id) {
            self.scene.actor_created(actor);
            self.spawned.push(actor.to_full_patch());
        }
        self.sync_body(id);
    }

    fn on_actor_update(&mut self, p: ActorUpdate) -> Result<(), DispatchError> {
        let id = p.actor.id;
        if !self.actors.update_actor(&p.actor) {
            return Ok(());
        }
        if let Some(actor) = self.actors.find(id) {
            self.scene.actor_updated(actor, &p.actor);
        }
        self.sync_body(id);

        let moved = p
            .actor
            .transform
            .as_ref()
            .is_some_and(|t| t.app.is_some());
        if moved {
            let pose = self.actors.find(id).map(|a| a.transform.app);
            if let (Some(pose), Some(body)) = (pose, self.physics.body_mut(id)) {
                if !body.owned {
                    body.position = pose.position;
                    body.rotation = pose.rotation;
                }
            }
        }
        Ok(())
    }

    fn on_destroy_actors(&mut self, p: DestroyActors) -> Result<(), DispatchError> {
        for id in p.actor_ids {
            self.destroy(id);
        }
        Ok(())
    }

    /// Remove `id` and its subtree everywhere. Returns `true` if any actor
    /// existed.
    fn destroy(&mut self, id: ActorId) -> bool {
        let mut removed = self.actors.destroy_subtree(id);
        if removed.is_empty() {
            debug!("Destroy for unknown actor {}", id);
            return false;
        }
        for r in &removed {
            self.physics.remove_body(*r);
        }
        removed.reverse();
        self.scene.actors_destroyed(&removed);
        true
    }

    fn on_set_behavior(&mut self, p: SetBehavior) -> Result<(), DispatchError> {
        match self.actors.find_mut(p.actor_id) {
            Some(actor) => actor.behavior = p.behavior_type,
            None => warn!("Behavior for unknown actor {}", p.actor_id),
        }
        Ok(())
    }

    fn on_actor_correction(&mut self, p: ActorCorrection) -> Result<(), DispatchError> {
        let Some(mut pose) = self.actors.find(p.actor_id).map(|a| a.transform.app) else {
            warn!("Correction for unknown actor {}", p.actor_id);
            return Ok(());
        };
        pose.apply_patch(&p.app_transform);
        self.actors.set_simulated_pose(p.actor_id, pose);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Users / assets / diagnostics
    // -----------------------------------------------------------------------

    fn on_user_joined(&mut self, p: UserJoined) -> Result<(), DispatchError> {
        if self.users.find(p.user.id).is_some() {
            self.users.update_user(&p.user);
            return Ok(());
        }
        let mut user = User::new(p.user.id, "", false);
        user.apply_patch(&p.user);
        self.users
            .add_user(user)
            .map_err(|e| DispatchError::rejected(UserJoined::TAG, e.to_string()))
    }

    fn on_user_left(&mut self, p: UserLeft) -> Result<(), DispatchError> {
        if self.users.remove_user(p.user_id).is_some() {
            self.refresh_bodies();
        }
        Ok(())
    }

    fn on_user_update(&mut self, p: UserUpdate) -> Result<(), DispatchError> {
        self.users.update_user(&p.user);
        Ok(())
    }

    fn on_create_asset(&mut self, p: CreateAsset) -> Result<(), DispatchError> {
        if self.assets.create(p.id, &p.name, p.material.as_ref()) {
            if let Some(asset) = self.assets.find(p.id) {
                self.scene.asset_changed(asset);
            }
        }
        Ok(())
    }

    fn on_asset_update(&mut self, p: AssetUpdate) -> Result<(), DispatchError> {
        if self.assets.update_material(p.id, &p.material) {
            if let Some(asset) = self.assets.find(p.id) {
                self.scene.asset_changed(asset);
            }
        }
        Ok(())
    }

    /// A malformed snapshot is logged and dropped whole by the bridge; the
    /// rest of the tick goes on.
    fn on_physics_update(&mut self, p: PhysicsBridgeUpdate) -> Result<(), DispatchError> {
        let _ = self.physics.receive_payload(&p);
        Ok(())
    }

    fn on_trace(&mut self, p: Trace) -> Result<(), DispatchError> {
        match p.severity {
            TraceSeverity::Debug => debug!("[app] {}", p.message),
            TraceSeverity::Info => info!("[app] {}", p.message),
            TraceSeverity::Warning => warn!("[app] {}", p.message),
            TraceSeverity::Error => error!("[app] {}", p.message),
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Physics bookkeeping
    // -----------------------------------------------------------------------

    /// Register, update or drop the physics body of actor `id`.
    fn sync_body(&mut self, id: ActorId) {
        let local = self.users.local_user().map(|u| u.id);
        let Some(actor) = self.actors.find(id) else {
            self.physics.remove_body(id);
            return;
        };
        let Some(rb) = actor.rigid_body.as_ref().filter(|rb| rb.enabled) else {
            self.physics.remove_body(id);
            return;
        };
        let owned = local.is_some() && actor.owner == local;
        let keyframed = rb.is_kinematic;
        let (velocity, angular_velocity) = (rb.velocity, rb.angular_velocity);
        let half_extents = body_half_extents(actor);
        let pose = actor.transform.app;

        match self.physics.body(id).map(|b| b.owned) {
            Some(was_owned) => {
                if was_owned != owned {
                    self.physics.set_owned(id, owned);
                }
                if let Some(body) = self.physics.body_mut(id) {
                    body.keyframed = keyframed;
                    body.half_extents = half_extents;
                }
            }
            None => {
                let mut body = BodyState::new(id, owned);
                body.keyframed = keyframed;
                body.half_extents = half_extents;
                body.position = pose.position;
                body.rotation = pose.rotation;
                body.linear_velocity = velocity;
                body.angular_velocity = angular_velocity;
                self.physics.add_body(body);
            }
        }
    }

    fn refresh_bodies(&mut self) {
        let ids: Vec<ActorId> = self.actors.iter().map(|a| a.id).collect();
        for id in ids {
            self.sync_body(id);
        }
    }

    fn write_back_poses(&mut self) {
        let poses: Vec<(ActorId, Transform)> =
            self.physics.bodies().map(|b| (b.id, b.pose())).collect();
        for (id, pose) in poses {
            self.actors.set_simulated_pose(id, pose);
        }
    }

    fn reset(&mut self) {
        let live: Vec<ActorId> = self.actors.iter().map(|a| a.id).collect();
        if !live.is_empty() {
            self.scene.actors_destroyed(&live);
        }
        self.actors.clear();
        self.users.clear();
        self.assets.clear();
        self.physics.clear();
        self.outbox.clear();
        self.spawned.clear();
    }
}

/// World-axis half size of an actor's collider, scaled.
fn body_half_extents(actor: &crate::actor::Actor) -> Vec3 {
    let geometry = actor
        .collider
        .as_ref()
        .filter(|c| c.enabled && !c.is_trigger)
        .map(|c| &c.geometry);
    let base = match geometry {
        Some(ColliderGeometry::Sphere { radius, .. }) => Vec3::splat(*radius),
        Some(ColliderGeometry::Box { size, .. }) | Some(ColliderGeometry::Capsule { size, .. }) => {
            *size * 0.5
        }
        Some(ColliderGeometry::Auto) => Vec3::splat(0.5),
        None => Vec3::ZERO,
    };
    base * actor.transform.local.scale.abs()
}

fn core_handlers() -> CommandDispatcher<SyncState> {
    let mut d = CommandDispatcher::new();
    d.context(ACTORS_CONTEXT)
        .on(|s: &mut SyncState, p: CreateActor| s.on_create_actor(p))
        .on(|s: &mut SyncState, p: ActorUpdate| s.on_actor_update(p))
        .on(|s: &mut SyncState, p: DestroyActors| s.on_destroy_actors(p))
        .on(|s: &mut SyncState, p: SetBehavior| s.on_set_behavior(p))
        .on(|s: &mut SyncState, p: ActorCorrection| s.on_actor_correction(p));
    d.context(USERS_CONTEXT)
        .on(|s: &mut SyncState, p: UserJoined| s.on_user_joined(p))
        .on(|s: &mut SyncState, p: UserLeft| s.on_user_left(p))
        .on(|s: &mut SyncState, p: UserUpdate| s.on_user_update(p));
    d.context(ASSETS_CONTEXT)
        .on(|s: &mut SyncState, p: CreateAsset| s.on_create_asset(p))
        .on(|s: &mut SyncState, p: AssetUpdate| s.on_asset_update(p));
    d.context(PHYSICS_CONTEXT)
        .on(|s: &mut SyncState, p: PhysicsBridgeUpdate| s.on_physics_update(p));
    d.context(APP_CONTEXT)
        .on(|s: &mut SyncState, p: Trace| s.on_trace(p));
    d
}

/// `create-actor` is acknowledged with `object-spawned` once its handler ran.
fn completion_for(message: &Message) -> Option<OnComplete<SyncState>> {
    if !message.payload.is::<CreateActor>() {
        return None;
    }
    let reply_to = message.id;
    Some(Box::new(move |s: &mut SyncState| {
        let actors = std::mem::take(&mut s.spawned);
        let result = std::mem::replace(&mut s.spawn_result, OperationResult::success());
        s.outbox
            .push(Message::reply(reply_to, ObjectSpawned { result, actors }));
    }))
}

// ---------------------------------------------------------------------------
// MreApp
// ---------------------------------------------------------------------------

/// Outcome of [`MreApp::user_join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserJoin {
    /// Added locally and announced to the app.
    Joined(UserId),
    /// Held until the session runs. The id depends on the permissions granted
    /// by then.
    Queued,
}

impl UserJoin {
    pub fn id(&self) -> Option<UserId> {
        match self {
            UserJoin::Joined(id) => Some(*id),
            UserJoin::Queued => None,
        }
    }
}

/// A join requested before the execution phase.
#[derive(Debug, Clone)]
struct PendingJoin {
    host_user_id: String,
    name: String,
}

pub struct MreApp {
    config: MreConfig,
    session: Session,
    dispatcher: CommandDispatcher<SyncState>,
    state: SyncState,
    events: EventQueue,
    /// Salts user ids unless tracking is granted.
    ephemeral_app_id: Uuid,
    /// Joins waiting for the execution phase, in request order.
    pending_joins: Vec<PendingJoin>,
    tick_count: u64,
}

impl MreApp {
    pub fn new(
        config: MreConfig,
        transport: impl Transport + 'static,
        manifest_loader: Arc<dyn ManifestLoader>,
        permission_manager: Arc<dyn PermissionManager>,
        scene: Box<dyn SceneRoot>,
    ) -> Self {
        let session = Session::new(
            config.client.clone(),
            transport,
            manifest_loader,
            permission_manager,
        );
        let state = SyncState::new(&config, scene);
        Self {
            config,
            session,
            dispatcher: core_handlers(),
            state,
            events: EventQueue::new(),
            ephemeral_app_id: Uuid::new_v4(),
            pending_joins: Vec::new(),
            tick_count: 0,
        }
    }

    pub fn config(&self) -> &MreConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Payload registry and extra handler contexts for plugins.
    pub fn extend(&mut self) -> (&mut crate::protocol::PayloadRegistry, &mut CommandDispatcher<SyncState>) {
        (self.session.registry_mut(), &mut self.dispatcher)
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SyncState {
        &mut self.state
    }

    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&LifecycleEvent) -> Result<(), ObserverError> + Send + 'static,
    {
        self.events.subscribe(observer);
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            live_actors: self.state.actors.live_count(),
            pending_actors: self.state.actors.pending_count(),
            users: self.state.users.len(),
            monitored_bodies: self.state.physics.predictor().monitored_count(),
            total_ticks: self.tick_count,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start a new connection attempt. State from any previous attempt is
    /// dropped before this returns.
    pub fn startup(&mut self, url: &str, session_id: &str) -> Result<(), AppError> {
        self.session.startup(url, session_id)?;
        self.reset();
        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.session.shutdown();
        self.reset();
    }

    fn reset(&mut self) {
        self.state.reset();
        self.pending_joins.clear();
    }

    pub fn on_permission_changed(&mut self, origin: &str) -> Result<bool, AppError> {
        Ok(self.session.on_permission_changed(origin)?)
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Salt for user ids on this connection.
    fn user_id_salt(&self) -> String {
        match &self.config.app.global_app_id {
            Some(global) if self.session.granted().contains(Permissions::USER_TRACKING) => {
                global.clone()
            }
            _ => self.ephemeral_app_id.to_string(),
        }
    }

    /// Join as the local user. Joins right away if executing, otherwise the
    /// request is held and joined once the session reaches `Running`.
    pub fn user_join(&mut self, host_user_id: &str, name: &str) -> Result<UserJoin, AppError> {
        if self.session.state() == SessionState::Stopped {
            return Err(SessionError::Stopped.into());
        }
        if !self.session.phase().is_execution() {
            debug!("Holding join for '{}' until execution", name);
            self.pending_joins.push(PendingJoin {
                host_user_id: host_user_id.to_string(),
                name: name.to_string(),
            });
            return Ok(UserJoin::Queued);
        }
        let id = self.join_now(host_user_id, name)?;
        Ok(UserJoin::Joined(id))
    }

    /// Build the local user from the permissions granted now and announce it.
    fn join_now(&mut self, host_user_id: &str, name: &str) -> Result<UserId, AppError> {
        let id = obfuscate_user_id(host_user_id, &self.user_id_salt());
        let mut user = User::new(id, name, true);
        user.interaction_enabled = self
            .session
            .granted()
            .contains(Permissions::USER_INTERACTION);
        let patch = user.to_full_patch();
        self.state.users.add_user(user)?;

        if let Err(e) = self.session.send(Message::new(UserJoined { user: patch })) {
            self.state.users.remove_user(id);
            return Err(e.into());
        }
        self.state.refresh_bodies();
        Ok(id)
    }

    fn flush_pending_joins(&mut self) -> Result<(), AppError> {
        for join in std::mem::take(&mut self.pending_joins) {
            match self.join_now(&join.host_user_id, &join.name) {
                Ok(id) => info!("User '{}' joined as {}", join.name, id),
                Err(AppError::User(e)) => warn!("Dropping held join for '{}': {}", join.name, e),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn queued_joins(&self) -> usize {
        self.pending_joins.len()
    }

    pub fn user_leave(&mut self, id: UserId) -> Result<Option<SendOutcome>, AppError> {
        if self.state.users.remove_user(id).is_none() {
            return Ok(None);
        }
        self.state.refresh_bodies();
        let outcome = self
            .session
            .send_or_queue(Message::new(UserLeft { user_id: id }))?;
        Ok(Some(outcome))
    }

    /// Destroy a local actor subtree, telling the app if anything existed.
    pub fn destroy_actor(&mut self, id: ActorId) -> Result<bool, AppError> {
        if !self.state.destroy(id) {
            return Ok(false);
        }
        if self.session.state() == SessionState::Running {
            self.session.send(Message::new(DestroyActors {
                actor_ids: vec![id],
            }))?;
        }
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    pub fn tick(&mut self, dt: f32) -> Result<TickReport, AppError> {
        self.tick_count += 1;
        let mut report = TickReport {
            tick: self.tick_count,
            ..TickReport::default()
        };
        let result = self.run_tick(dt, &mut report);
        if let Err(e) = &result {
            error!("Tick {} failed: {}", self.tick_count, e);
        }
        self.collect_session_events();
        report.events = self.events.notify();
        result.map(|()| report)
    }

    fn run_tick(&mut self, dt: f32, report: &mut TickReport) -> Result<(), AppError> {
        // (a)
        let update = self.session.update();
        self.collect_session_events();
        update?;
        if self.session.phase().is_execution() && !self.pending_joins.is_empty() {
            self.flush_pending_joins()?;
        }

        // (b)
        while let Some(message) = self.session.next_inbound() {
            if self.dispatch(message)? {
                report.dispatched += 1;
            } else {
                report.deferred += 1;
            }
            report.dispatched += self.dispatch_released()?;
            self.flush_outbox()?;
        }

        // (c)
        self.state.physics.step(dt);
        self.state.write_back_poses();

        // (d)
        if self.session.state() == SessionState::Running {
            report.outbound = self.send_outbound()?;
        }
        Ok(())
    }

    fn collect_session_events(&mut self) {
        let events = self.session.take_events();
        // Startup and shutdown reset synchronously; only a transport loss
        // discovered during the tick resets here.
        if events
            .iter()
            .any(|e| matches!(e, LifecycleEvent::Disconnected { .. }))
        {
            self.reset();
        }
        self.events.extend(events);
    }

    fn context_of(&self, tag: &str) -> String {
        self.session
            .registry()
            .context_of(tag)
            .unwrap_or(APP_CONTEXT)
            .to_string()
    }

    /// Returns `false` if the command was deferred for a pending actor.
    fn dispatch(&mut self, message: Message) -> Result<bool, AppError> {
        let context = self.context_of(message.tag());
        let on_complete = completion_for(&message);
        let payload = message.payload;

        if let Some(actor_id) = payload.target_actor() {
            let command = ActorCommand::new(payload, on_complete);
            match self.state.actors.process_actor_command(actor_id, command) {
                CommandStatus::Queued => return Ok(false),
                CommandStatus::Ready(command) => {
                    self.dispatcher.execute(
                        &mut self.state,
                        &context,
                        command.payload,
                        command.on_complete,
                    )?;
                }
            }
        } else {
            self.dispatcher
                .execute(&mut self.state, &context, payload, on_complete)?;
        }
        Ok(true)
    }

    /// Run commands released by actors that became live.
    fn dispatch_released(&mut self) -> Result<usize, AppError> {
        let mut count = 0;
        loop {
            let ready = self.state.actors.take_ready_commands();
            if ready.is_empty() {
                return Ok(count);
            }
            for command in ready {
                let context = self.context_of(command.payload.tag());
                self.dispatcher.execute(
                    &mut self.state,
                    &context,
                    command.payload,
                    command.on_complete,
                )?;
                count += 1;
            }
        }
    }

    fn flush_outbox(&mut self) -> Result<(), AppError> {
        for message in std::mem::take(&mut self.state.outbox) {
            match self.session.send(message) {
                Ok(()) => {}
                Err(SessionError::NotRunning) => warn!("Dropping reply, session not synced"),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn send_outbound(&mut self) -> Result<usize, AppError> {
        let mut sent = 0;
        for patch in self.state.actors.collect_outbound_patches() {
            self.session
                .send(Message::new(ActorUpdate { actor: patch }))?;
            sent += 1;
        }

        match self.session.operating_model().unwrap_or_default() {
            OperatingModel::PeerAuthoritative => {
                if let Some(snapshot) = self.state.physics.outbound_snapshot() {
                    self.session.send(Message::new(snapshot.to_payload()))?;
                    sent += 1;
                }
            }
            OperatingModel::ServerAuthoritative => {
                let corrections: Vec<ActorCorrection> = self
                    .state
                    .physics
                    .bodies()
                    .filter(|b| b.owned && !b.sleeping)
                    .map(|b| ActorCorrection {
                        actor_id: b.id,
                        app_transform: b.pose().to_full_patch(),
                    })
                    .collect();
                for correction in corrections {
                    self.session.send(Message::new(correction))?;
                    sent += 1;
                }
            }
        }
        Ok(sent)
    }
}

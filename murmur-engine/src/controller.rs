//! Playback controller: at most one soundscape session at a time.
//!
//! A session is the set of graph nodes and pending timers created by one
//! successful `play`. Switching soundscapes tears the old session down
//! completely (timers cancelled, liveness token revoked, nodes released)
//! before the new one is built, so nothing from A can sound once B starts.
//!
//! Timers run on the output sample clock: [`SoundEngine::render`] splits each
//! block at the next due timer, fires it, and carries on rendering. A fired
//! timer only acts if its token is live and its session is still the active
//! one; otherwise it is dropped without rescheduling.
//!
//! The control surface never returns errors. Failures are logged through
//! `tracing` and degrade to silence.

use std::collections::HashSet;
use std::time::Duration;

use murmur_core::dsp::clamp01;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::context::{OfflineContext, OutputContext};
use crate::error::{EngineError, Result};
use crate::graph::{NodeId, Owner, SessionId};
use crate::mixer::Mixer;
use crate::prefs::{NullStore, PreferenceStore, Preferences};
use crate::scheduler::{ms_to_frames, LivenessToken, Scheduler, Task, TaskHandle};
use crate::soundscapes::{self, BuildParams, PreparedSoundscape, SoundscapeDefinition, SoundscapeId};
use crate::transient::PreparedVoice;

const SCRATCH_FRAMES: usize = 1024;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing(SoundscapeId),
}

struct ActiveSession {
    id: SessionId,
    soundscape: SoundscapeId,
    nodes: Vec<NodeId>,
    tasks: HashSet<TaskHandle>,
    token: LivenessToken,
    voice: Option<PreparedVoice>,
}

/// Builder for [`SoundEngine`].
pub struct EngineBuilder {
    config: EngineConfig,
    context: Option<Box<dyn OutputContext>>,
    prefs: Box<dyn PreferenceStore>,
    rng: Option<Box<dyn RngCore + Send>>,
}

impl EngineBuilder {
    /// Output device; defaults to an [`OfflineContext`] at the configured rate and width.
    pub fn context(mut self, ctx: impl OutputContext + 'static) -> Self {
        self.context = Some(Box::new(ctx));
        self
    }

    pub fn prefs(mut self, store: impl PreferenceStore + 'static) -> Self {
        self.prefs = Box::new(store);
        self
    }

    pub fn rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Deterministic randomness (noise beds and transient timing).
    pub fn seed(self, seed: u64) -> Self { self.rng(StdRng::seed_from_u64(seed)) }

    pub fn build(self) -> Result<SoundEngine> {
        self.config.validate()?;
        let EngineBuilder { config, context, mut prefs, rng } = self;

        let context: Box<dyn OutputContext> = match context {
            Some(ctx) => ctx,
            None => Box::new(OfflineContext::new(config.sample_rate, config.channels)),
        };
        let sr = context.sample_rate();
        if !(sr > 0.0) {
            return Err(EngineError::InvalidConfig(format!("context sample rate {sr} is not positive")));
        }
        let rng: Box<dyn RngCore + Send> = match rng {
            Some(rng) => rng,
            None => Box::new(StdRng::from_entropy()),
        };

        let stored = match prefs.load() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "could not load preferences; using defaults");
                None
            }
        };
        let volume = stored
            .as_ref()
            .map(|p| p.volume)
            .filter(|v| v.is_finite())
            .map_or(config.default_volume, clamp01);
        let last_soundscape = stored
            .as_ref()
            .and_then(|p| p.last_sound.as_deref())
            .and_then(|s| s.parse::<SoundscapeId>().ok());

        info!(sample_rate = sr, channels = context.channels(), volume, "engine ready");

        Ok(SoundEngine {
            mixer: Mixer::new(sr, config.max_nodes, volume, config.volume_ramp_ms),
            channels: context.channels().max(1),
            scheduler: Scheduler::new(),
            session: None,
            next_session: 0,
            context,
            prefs,
            rng,
            volume,
            last_soundscape,
            bursts_emitted: 0,
            clusters_fired: 0,
            scratch: Vec::new(),
            config,
        })
    }
}

/// The playback controller.
pub struct SoundEngine {
    config: EngineConfig,
    mixer: Mixer,
    channels: usize,
    scheduler: Scheduler,
    session: Option<ActiveSession>,
    next_session: u64,
    context: Box<dyn OutputContext>,
    prefs: Box<dyn PreferenceStore>,
    rng: Box<dyn RngCore + Send>,
    volume: f32,
    last_soundscape: Option<SoundscapeId>,
    bursts_emitted: u64,
    clusters_fired: u64,
    scratch: Vec<f32>,
}

impl SoundEngine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder { config, context: None, prefs: Box::new(NullStore), rng: None }
    }

    // ---------------------------------------------------------------- control

    /// Start soundscape `id`, replacing whatever is playing.
    ///
    /// Unknown ids are ignored. Replaying the current soundscape is a no-op.
    /// Returns true when `id` is playing afterwards.
    pub fn play(&mut self, id: &str) -> bool {
        let Some(def) = soundscapes::lookup(id) else {
            debug!(id, "ignoring unknown soundscape");
            return false;
        };
        if self.current_soundscape() == Some(def.id) {
            return true;
        }
        let params = self.build_params();
        match PreparedSoundscape::render(id, params, &mut *self.rng) {
            Some(prepared) => self.play_prepared(prepared),
            None => false,
        }
    }

    /// Start a soundscape rendered with [`PreparedSoundscape::render`].
    ///
    /// Same contract as [`play`](Self::play). Only graph wiring happens here,
    /// so a host sharing the engine with its audio callback can render first
    /// and hold the lock just for this call. A soundscape rendered for another
    /// sample rate is refused and playback is left as it was.
    pub fn play_prepared(&mut self, prepared: PreparedSoundscape) -> bool {
        if self.current_soundscape() == Some(prepared.id()) {
            return true;
        }
        if prepared.sample_rate() != self.mixer.sample_rate() {
            warn!(
                soundscape = %prepared.id(),
                rendered = prepared.sample_rate(),
                expected = self.mixer.sample_rate(),
                "soundscape rendered for another sample rate"
            );
            return false;
        }

        self.teardown();

        let soundscape = prepared.id();
        if let Err(e) = self.context.resume() {
            warn!(%soundscape, error = %e, "output device unavailable");
            self.persist();
            return false;
        }

        let ok = match self.build_session(prepared) {
            Ok(session) => {
                info!(
                    %soundscape,
                    session = session.id.0,
                    nodes = session.nodes.len(),
                    "playing"
                );
                self.session = Some(session);
                true
            }
            Err(e) => {
                warn!(%soundscape, error = %e, "could not build soundscape");
                false
            }
        };
        self.persist();
        ok
    }

    /// Stop playback. Idempotent; a no-op while idle.
    pub fn stop(&mut self) {
        if self.teardown() {
            info!("stopped");
            self.persist();
        }
    }

    /// Stop if `id` is the current soundscape, otherwise play it.
    pub fn toggle(&mut self, id: &str) -> bool {
        if soundscapes::lookup(id).is_some_and(|d| self.current_soundscape() == Some(d.id)) {
            self.stop();
            false
        } else {
            self.play(id)
        }
    }

    /// Set the master volume, clamped to [0, 1] and ramped. NaN is ignored.
    pub fn set_volume(&mut self, v: f32) {
        if v.is_nan() {
            debug!("ignoring NaN volume");
            return;
        }
        let v = clamp01(v);
        self.volume = v;
        self.mixer.set_volume(v);
        debug!(volume = v, "volume");
        self.persist();
    }

    // ---------------------------------------------------------------- queries

    pub fn state(&self) -> PlaybackState {
        match &self.session {
            Some(s) => PlaybackState::Playing(s.soundscape),
            None => PlaybackState::Idle,
        }
    }

    #[inline] pub fn is_playing(&self) -> bool { self.session.is_some() }

    pub fn current_soundscape(&self) -> Option<SoundscapeId> { self.session.as_ref().map(|s| s.soundscape) }

    pub fn session_id(&self) -> Option<SessionId> { self.session.as_ref().map(|s| s.id) }

    /// Target volume in [0, 1].
    #[inline] pub fn volume(&self) -> f32 { self.volume }

    /// Current smoothed master gain.
    #[inline] pub fn master_gain(&self) -> f32 { self.mixer.master_gain() }

    /// Soundscape stored by a previous run. Never auto-played.
    pub fn last_soundscape(&self) -> Option<SoundscapeId> { self.last_soundscape }

    pub fn catalog(&self) -> &'static [SoundscapeDefinition] { soundscapes::catalog() }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            volume: self.volume,
            last_sound: self.current_soundscape().map(|id| id.as_str().to_string()),
        }
    }

    #[inline] pub fn sample_rate(&self) -> f32 { self.mixer.sample_rate() }
    #[inline] pub fn channels(&self) -> usize { self.channels }
    #[inline] pub fn config(&self) -> &EngineConfig { &self.config }

    /// Frames rendered so far.
    #[inline] pub fn clock(&self) -> u64 { self.mixer.clock() }

    /// Nodes of the active session's continuous subgraph.
    pub fn active_node_count(&self) -> usize {
        self.session_id().map_or(0, |id| self.owned_node_count(id))
    }

    pub fn owned_node_count(&self, session: SessionId) -> usize {
        self.mixer.graph().owned_count(Owner::Session(session))
    }

    /// Every live node, transient bursts included.
    pub fn graph_len(&self) -> usize { self.mixer.graph().len() }

    /// Timers still queued for the active session.
    pub fn pending_event_count(&self) -> usize {
        self.session_id().map_or(0, |id| self.scheduler.pending_for(id))
    }

    pub fn pending_events_for(&self, session: SessionId) -> usize { self.scheduler.pending_for(session) }

    /// Transient bursts wired into the graph since construction.
    #[inline] pub fn transient_bursts_emitted(&self) -> u64 { self.bursts_emitted }

    /// Transient clusters started since construction. A cluster's first
    /// burst is emitted on the frame the cluster starts.
    #[inline] pub fn transient_clusters_fired(&self) -> u64 { self.clusters_fired }

    /// What [`PreparedSoundscape::render`] needs to match this engine.
    pub fn build_params(&self) -> BuildParams {
        BuildParams { sample_rate: self.mixer.sample_rate(), loop_seconds: self.config.loop_seconds }
    }

    // ---------------------------------------------------------------- rendering

    /// Fill an interleaved buffer of `channels()`-wide frames, firing due timers
    /// at their exact frame. A trailing partial frame is zeroed.
    pub fn render(&mut self, out: &mut [f32]) {
        let ch = self.channels;
        let frames = out.len() / ch;
        let mut done = 0;
        while done < frames {
            self.run_due();
            let now = self.mixer.clock();
            let remaining = frames - done;
            let span = self
                .scheduler
                .next_due()
                .map_or(remaining, |due| (due.saturating_sub(now) as usize).clamp(1, remaining));
            self.mixer.render(&mut out[done * ch..(done + span) * ch], ch);
            done += span;
        }
        out[frames * ch..].fill(0.0);
    }

    /// Render and discard `duration` of output.
    pub fn advance(&mut self, duration: Duration) {
        let mut left = (duration.as_secs_f64() * f64::from(self.sample_rate())).round() as usize;
        let ch = self.channels;
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.resize(SCRATCH_FRAMES * ch, 0.0);
        while left > 0 {
            let n = left.min(SCRATCH_FRAMES);
            self.render(&mut scratch[..n * ch]);
            left -= n;
        }
        self.scratch = scratch;
    }

    // ---------------------------------------------------------------- internals

    fn build_session(&mut self, prepared: PreparedSoundscape) -> Result<ActiveSession> {
        let id = SessionId(self.next_session);
        self.next_session += 1;
        let owner = Owner::Session(id);
        let soundscape = prepared.id();
        let (beds, voice) = prepared.into_parts();

        let nodes = match beds.build(self.mixer.graph_mut(), owner) {
            Ok(nodes) => nodes,
            Err(e) => {
                let released = self.mixer.graph_mut().remove_owner(owner);
                debug!(session = id.0, released, "released partial subgraph");
                return Err(e.into());
            }
        };

        let mut session = ActiveSession {
            id,
            soundscape,
            nodes,
            tasks: HashSet::new(),
            token: LivenessToken::new(),
            voice: None,
        };
        if let Some(voice) = voice {
            let startup_ms = voice.profile().startup_ms.sample(&mut *self.rng);
            let delay = ms_to_frames(startup_ms, self.mixer.sample_rate());
            let handle =
                self.scheduler.schedule(self.mixer.clock(), delay, id, session.token.clone(), Task::Cluster);
            session.tasks.insert(handle);
            session.voice = Some(voice);
        }
        Ok(session)
    }

    /// Release the active session. Returns false if there was none.
    fn teardown(&mut self) -> bool {
        let Some(session) = self.session.take() else { return false };
        session.token.revoke();
        let mut cancelled = 0;
        for handle in &session.tasks {
            if self.scheduler.cancel(*handle) {
                cancelled += 1;
            }
        }
        cancelled += self.scheduler.cancel_session(session.id);
        let released = self.mixer.graph_mut().remove_owner(Owner::Session(session.id));
        debug!(
            soundscape = %session.soundscape,
            session = session.id.0,
            cancelled,
            released,
            "session torn down"
        );
        true
    }

    fn run_due(&mut self) {
        let now = self.mixer.clock();
        while let Some(timer) = self.scheduler.pop_due(now) {
            let active = self.session.as_mut().filter(|s| s.id == timer.session);
            let Some(session) = active.filter(|_| timer.token.is_live()) else {
                trace!(session = timer.session.0, "dropping stale timer");
                continue;
            };
            session.tasks.remove(&timer.handle);
            match timer.task {
                Task::Cluster => self.fire_cluster(now),
                Task::Burst => self.fire_burst(),
            }
        }
    }

    fn fire_cluster(&mut self, now: u64) {
        let sr = self.mixer.sample_rate();
        let Some(session) = self.session.as_mut() else { return };
        let Some(profile) = session.voice.as_ref().map(PreparedVoice::profile) else { return };

        self.clusters_fired += 1;
        let count = profile.cluster_size(&mut *self.rng);
        let mut offset_ms = 0.0;
        for _ in 0..count {
            let h = self.scheduler.schedule(
                now,
                ms_to_frames(offset_ms, sr),
                session.id,
                session.token.clone(),
                Task::Burst,
            );
            session.tasks.insert(h);
            offset_ms += profile.spacing_ms.sample(&mut *self.rng);
        }
        let next_ms = profile.next_ms.sample(&mut *self.rng);
        let h = self.scheduler.schedule(now, ms_to_frames(next_ms, sr), session.id, session.token.clone(), Task::Cluster);
        session.tasks.insert(h);
        trace!(kind = ?profile.kind, count, next_ms, "transient cluster");
    }

    fn fire_burst(&mut self) {
        let sr = self.mixer.sample_rate();
        let Some(voice) = self.session.as_ref().and_then(|s| s.voice.as_ref()) else { return };
        match voice.spawn(self.mixer.graph_mut(), sr, &mut *self.rng) {
            Ok(_) => self.bursts_emitted += 1,
            Err(e) => debug!(error = %e, "skipping transient burst"),
        }
    }

    fn persist(&mut self) {
        let prefs = self.preferences();
        if let Err(e) = self.prefs.save(&prefs) {
            warn!(error = %e, "could not save preferences");
        }
    }
}

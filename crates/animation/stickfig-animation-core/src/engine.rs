//! Playback engine: owns the loaded animation, drives the strategy clock, pushes
//! resolved poses into a [`RenderSink`] and reports progress.
//!
//! The engine is single-threaded and host-driven. Nothing happens between calls;
//! the host calls [`PlaybackEngine::tick`] (or `fire_timer`) to let time pass.

use hashbrown::HashMap;
use log::{debug, info, warn};

use crate::clock::{
    FrameStepper, PlaybackStatus, PlaybackStrategy, StrategyKind, Timeline, FRAME_CALLBACK_STRIDE,
};
use crate::config::Config;
use crate::data::{Animation, Keyframe};
use crate::error::AnimatorError;
use crate::export::{self, FrameStream, ResolvedFrame};
use crate::ids::{CharacterId, PropId, RenderHandle, TimerToken};
use crate::inputs::{CommandQueue, PlaybackCommand, SeekTarget};
use crate::outputs::{PlaybackEvent, PlaybackSnapshot};
use crate::payload::{parse_payload_json, AnimationPayload};
use crate::pose::{PartShape, PoseVariant};
use crate::schedule::{MonotonicTime, PendingTimer, TimeSource, TimerKind, TimerSlot};
use crate::sink::RenderSink;

/// Called with the keyframe (or frame) index and the keyframe itself.
pub type KeyframeCallback = Box<dyn FnMut(usize, &Keyframe)>;
pub type CompleteCallback = Box<dyn FnMut()>;

/// Upper bound on commands applied per drain; a callback that keeps re-queueing
/// `play` would otherwise never return.
const MAX_COMMANDS_PER_DRAIN: usize = 64;

/// Timers due within this tolerance of the pending one are not re-armed.
const RESCHEDULE_EPSILON_MS: f64 = 1e-3;

/// Per-load state. Dropped on clear and replaced on load.
struct Session {
    anim: Animation,
    strategy: PlaybackStrategy,
    status: PlaybackStatus,
    characters: HashMap<CharacterId, RenderHandle>,
    props: HashMap<PropId, RenderHandle>,
    /// Continuous mode: first keyframe not yet reported.
    next_keyframe: usize,
}

pub struct PlaybackEngine<S: RenderSink> {
    cfg: Config,
    sink: S,
    time: Box<dyn TimeSource>,
    timers: TimerSlot,
    session: Option<Session>,
    commands: CommandQueue,
    events: Vec<PlaybackEvent>,
    on_keyframe: Option<KeyframeCallback>,
    on_complete: Option<CompleteCallback>,
    /// Set while queued commands are being applied; nested drains return early.
    draining: bool,
}

impl<S: RenderSink> PlaybackEngine<S> {
    /// Engine on the monotonic std clock.
    pub fn new(cfg: Config, sink: S) -> Self {
        Self::with_time_source(cfg, sink, MonotonicTime::new())
    }

    pub fn with_time_source(cfg: Config, sink: S, time: impl TimeSource + 'static) -> Self {
        Self {
            cfg,
            sink,
            time: Box::new(time),
            timers: TimerSlot::new(),
            session: None,
            commands: CommandQueue::new(),
            events: Vec::new(),
            on_keyframe: None,
            on_complete: None,
            draining: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn animation(&self) -> Option<&Animation> {
        self.session.as_ref().map(|s| &s.anim)
    }

    pub fn status(&self) -> PlaybackStatus {
        self.session
            .as_ref()
            .map_or(PlaybackStatus::Stopped, |s| s.status)
    }

    pub fn now_ms(&self) -> f64 {
        self.time.now_ms()
    }

    /// Handle for queueing commands from inside callbacks.
    pub fn commands(&self) -> CommandQueue {
        self.commands.clone()
    }

    pub fn on_keyframe_reached(&mut self, cb: impl FnMut(usize, &Keyframe) + 'static) {
        self.on_keyframe = Some(Box::new(cb));
    }

    pub fn on_complete(&mut self, cb: impl FnMut() + 'static) {
        self.on_complete = Some(Box::new(cb));
    }

    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    // ---------- Loading ----------

    /// Tear down the current session, then normalize and install `payload`.
    ///
    /// On error the engine is left empty.
    pub fn load(&mut self, payload: AnimationPayload) -> Result<(), AnimatorError> {
        self.teardown();
        let anim = Animation::from_payload(payload, &self.cfg)?;

        let mut characters = HashMap::with_capacity(anim.characters.len());
        for c in &anim.characters {
            characters.insert(c.id.clone(), self.sink.create_character(c));
        }
        let mut props = HashMap::with_capacity(anim.props.len());
        for p in &anim.props {
            props.insert(p.id.clone(), self.sink.create_prop(p));
        }

        let strategy = match anim.strategy_kind() {
            StrategyKind::Continuous => {
                PlaybackStrategy::Continuous(Timeline::new(&anim.keyframes, self.cfg.default_easing))
            }
            StrategyKind::Discrete => {
                PlaybackStrategy::Discrete(FrameStepper::new(anim.frame_offsets()))
            }
        };

        info!(
            "loaded animation {:?}: {} keyframes, {} characters, {:?} playback",
            anim.title.as_deref().unwrap_or("untitled"),
            anim.keyframes.len(),
            anim.characters.len(),
            strategy.kind()
        );
        self.events.push(PlaybackEvent::Loaded {
            strategy: strategy.kind(),
            keyframes: anim.keyframes.len(),
            characters: anim.characters.len(),
            skipped_poses: anim.skipped_poses,
        });
        self.session = Some(Session {
            anim,
            strategy,
            status: PlaybackStatus::Stopped,
            characters,
            props,
            next_keyframe: 0,
        });
        Ok(())
    }

    pub fn load_json(&mut self, json: &str) -> Result<(), AnimatorError> {
        match parse_payload_json(json) {
            Ok(payload) => self.load(payload),
            Err(e) => {
                self.teardown();
                Err(e)
            }
        }
    }

    /// Drop the session and clear the sink. Callbacks stay registered.
    pub fn clear(&mut self) {
        self.teardown();
        self.events.push(PlaybackEvent::Cleared);
    }

    fn teardown(&mut self) {
        self.timers.cancel();
        self.commands.clear();
        if self.session.take().is_some() {
            debug!("session torn down");
        }
        self.sink.clear();
    }

    // ---------- Playback control ----------

    /// Start from the beginning, pushing the first pose synchronously.
    pub fn play(&mut self) {
        let now = self.time.now_ms();
        let Some(mut session) = self.session.take() else {
            self.reject("play");
            return;
        };
        self.begin(&mut session, now);
        self.session = Some(session);
        self.drain_commands();
    }

    pub fn pause(&mut self) {
        let now = self.time.now_ms();
        let Some(mut session) = self.session.take() else {
            self.reject("pause");
            return;
        };
        match session.status {
            PlaybackStatus::Playing => {
                self.timers.cancel();
                session.strategy.pause(now);
                session.status = PlaybackStatus::Paused;
                self.events.push(PlaybackEvent::Paused {
                    progress: session.strategy.progress(now),
                });
                debug!("paused");
            }
            PlaybackStatus::Starting => {
                // Settle delay interrupted: hold at the first pose.
                self.timers.cancel();
                session.strategy.start(now);
                session.strategy.pause(now);
                session.next_keyframe = 0;
                session.status = PlaybackStatus::Paused;
                self.events.push(PlaybackEvent::Paused { progress: 0.0 });
            }
            _ => {}
        }
        self.session = Some(session);
    }

    pub fn resume(&mut self) {
        let now = self.time.now_ms();
        let Some(mut session) = self.session.take() else {
            self.reject("resume");
            return;
        };
        if session.status == PlaybackStatus::Paused {
            session.strategy.resume(now);
            session.status = PlaybackStatus::Playing;
            self.events.push(PlaybackEvent::Resumed {
                progress: session.strategy.progress(now),
            });
            debug!("resumed");
            self.step(&mut session, now);
        }
        self.session = Some(session);
        self.drain_commands();
    }

    /// Back to the first pose now; playback begins after the settle delay.
    pub fn restart(&mut self) {
        let now = self.time.now_ms();
        let Some(mut session) = self.session.take() else {
            self.reject("restart");
            return;
        };
        self.timers.cancel();
        session.status = PlaybackStatus::Starting;
        session.next_keyframe = 0;
        let first = export::resolve_keyframe(&session.anim, 0);
        self.push_frame(&session, &first, true);

        let delay = self.cfg.settle_delay_ms;
        self.timers.schedule(TimerKind::Start, now + delay);
        self.events.push(PlaybackEvent::Restarting { delay_ms: delay });
        debug!("restarting in {delay} ms");
        self.session = Some(session);
    }

    /// Jump without replaying intermediate frames or callbacks. From a stopped,
    /// completed or restarting session the engine ends up paused at the target.
    pub fn seek(&mut self, target: SeekTarget) {
        let now = self.time.now_ms();
        let Some(mut session) = self.session.take() else {
            self.reject("seek");
            return;
        };
        if matches!(
            session.status,
            PlaybackStatus::Stopped | PlaybackStatus::Completed | PlaybackStatus::Starting
        ) {
            self.timers.cancel();
            session.strategy.start(now);
            session.strategy.pause(now);
            session.status = PlaybackStatus::Paused;
        }

        let keyframes = &session.anim.keyframes;
        let frame = match &mut session.strategy {
            PlaybackStrategy::Continuous(tl) => {
                let t = match target {
                    SeekTarget::TimeMs(t) => t,
                    SeekTarget::Frame(i) => keyframes
                        .get(i)
                        .or(keyframes.last())
                        .map_or(0.0, |k| k.timestamp_ms),
                };
                tl.seek(now, if t.is_finite() { t } else { 0.0 });
                let cursor = tl.cursor_at(now);
                session.next_keyframe = keyframes.partition_point(|k| k.timestamp_ms <= cursor);
                export::resolve_at(&session.anim, tl.segments(), cursor)
            }
            PlaybackStrategy::Discrete(fs) => {
                let index = match target {
                    SeekTarget::Frame(i) => i,
                    SeekTarget::TimeMs(t) => {
                        let first = keyframes.first().map_or(0.0, |k| k.timestamp_ms);
                        fs.index_at(t - first)
                    }
                };
                let index = fs.jump(index, now);
                export::resolve_keyframe(&session.anim, index)
            }
        };
        self.push_frame(&session, &frame, true);
        self.events.push(PlaybackEvent::Seeked {
            index: frame.index,
            progress: session.strategy.progress(now),
        });

        if session.status == PlaybackStatus::Playing {
            self.settle(&mut session, now);
        }
        self.session = Some(session);
        self.drain_commands();
    }

    /// Apply one command as if the corresponding method had been called.
    pub fn apply(&mut self, cmd: PlaybackCommand) {
        match cmd {
            PlaybackCommand::Play => self.play(),
            PlaybackCommand::Pause => self.pause(),
            PlaybackCommand::Resume => self.resume(),
            PlaybackCommand::Restart => self.restart(),
            PlaybackCommand::Seek(target) => self.seek(target),
        }
    }

    // ---------- Host driving ----------

    /// Advance to the current time: fire a due timer, otherwise render the
    /// current continuous pose. Call once per animation frame.
    pub fn tick(&mut self) {
        let now = self.time.now_ms();
        if let Some(timer) = self.timers.take_due(now) {
            self.handle_timer(timer, now);
        } else if let Some(mut session) = self.session.take() {
            if session.status == PlaybackStatus::Playing {
                self.step(&mut session, now);
            }
            self.session = Some(session);
        }
        self.drain_commands();
    }

    /// The single pending timer, if any, for hosts that arm native timers.
    pub fn pending_timer(&self) -> Option<PendingTimer> {
        self.timers.pending()
    }

    /// Host timer expired. Stale tokens (cancelled or replaced) are ignored.
    pub fn fire_timer(&mut self, token: TimerToken) {
        let Some(timer) = self.timers.take_if_current(token) else {
            debug!("ignoring stale timer {token:?}");
            return;
        };
        let now = self.time.now_ms();
        self.handle_timer(timer, now);
        self.drain_commands();
    }

    fn handle_timer(&mut self, timer: PendingTimer, now: f64) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        match (timer.kind, session.status) {
            (TimerKind::Start, PlaybackStatus::Starting) => self.begin(&mut session, now),
            (TimerKind::Step, PlaybackStatus::Playing) => self.step(&mut session, now),
            (kind, status) => debug!("timer {kind:?} ignored while {status:?}"),
        }
        self.session = Some(session);
    }

    fn drain_commands(&mut self) {
        if self.draining {
            return;
        }
        self.draining = true;
        for _ in 0..MAX_COMMANDS_PER_DRAIN {
            let Some(cmd) = self.commands.pop() else {
                break;
            };
            debug!("applying queued {cmd:?}");
            self.apply(cmd);
        }
        self.draining = false;
        if !self.commands.is_empty() {
            warn!(
                "dropping {} queued commands after {MAX_COMMANDS_PER_DRAIN} in one drain",
                self.commands.len()
            );
            self.commands.clear();
        }
    }

    // ---------- Stepping ----------

    fn begin(&mut self, session: &mut Session, now: f64) {
        self.timers.cancel();
        session.strategy.start(now);
        session.status = PlaybackStatus::Playing;
        session.next_keyframe = 0;
        self.events.push(PlaybackEvent::Started);
        debug!("playing from the start");

        match session.strategy {
            PlaybackStrategy::Discrete(_) => self.show_discrete_frame(session, 0),
            // The first keyframe may sit later than 0 ms; its text shows from the start.
            PlaybackStrategy::Continuous(_) => {
                if let Some(text) = session.anim.keyframes.first().and_then(|k| k.text.as_ref()) {
                    self.sink.set_narration_text(text);
                }
            }
        }
        self.step(session, now);
    }

    /// Render what is due at `now`, report reached keyframes, then complete or
    /// schedule the next step.
    fn step(&mut self, session: &mut Session, now: f64) {
        match session.strategy.kind() {
            StrategyKind::Continuous => self.step_continuous(session, now),
            StrategyKind::Discrete => self.step_discrete(session, now),
        }
        self.settle(session, now);
    }

    fn step_continuous(&mut self, session: &mut Session, now: f64) {
        let PlaybackStrategy::Continuous(tl) = &session.strategy else {
            return;
        };
        let cursor = tl.cursor_at(now);
        let frame = export::resolve_at(&session.anim, tl.segments(), cursor);
        self.push_frame(session, &frame, false);
        while let Some(kf) = session.anim.keyframes.get(session.next_keyframe) {
            if kf.timestamp_ms > cursor {
                break;
            }
            let index = session.next_keyframe;
            session.next_keyframe += 1;
            self.reach_keyframe(session, index);
        }
    }

    /// Render every frame that is due, in order, so a late timer catches up.
    fn step_discrete(&mut self, session: &mut Session, now: f64) {
        loop {
            let next = match &mut session.strategy {
                PlaybackStrategy::Discrete(fs) if fs.delay_to_next(now) == Some(0.0) => {
                    fs.advance()
                }
                _ => None,
            };
            let Some(index) = next else {
                break;
            };
            self.show_discrete_frame(session, index);
        }
    }

    fn settle(&mut self, session: &mut Session, now: f64) {
        let due = match &session.strategy {
            PlaybackStrategy::Continuous(tl) => {
                if tl.is_finished(now) {
                    None
                } else {
                    // Wake at the next keyframe boundary, or at the end.
                    let target = session
                        .anim
                        .keyframes
                        .get(session.next_keyframe)
                        .map_or(tl.total_ms(), |k| k.timestamp_ms);
                    Some(now + tl.remaining_until(now, target).unwrap_or(0.0))
                }
            }
            PlaybackStrategy::Discrete(fs) => fs.delay_to_next(now).map(|d| now + d),
        };

        match due {
            Some(due) => {
                let current = self
                    .timers
                    .pending()
                    .filter(|t| t.kind == TimerKind::Step)
                    .map(|t| t.due_ms);
                if current.map_or(true, |c| (c - due).abs() > RESCHEDULE_EPSILON_MS) {
                    self.timers.schedule(TimerKind::Step, due);
                }
            }
            None => self.complete(session),
        }
    }

    fn complete(&mut self, session: &mut Session) {
        self.timers.cancel();
        session.status = PlaybackStatus::Completed;
        self.events.push(PlaybackEvent::Completed);
        info!("playback completed");
        if let Some(cb) = self.on_complete.as_mut() {
            cb();
        }
    }

    fn show_discrete_frame(&mut self, session: &Session, index: usize) {
        let frame = export::resolve_keyframe(&session.anim, index);
        self.push_frame(session, &frame, false);
        if let Some(text) = &session.anim.keyframes[index].text {
            self.sink.set_narration_text(text);
        }
        if index % FRAME_CALLBACK_STRIDE == 0 {
            self.notify_keyframe(session, index);
        }
    }

    fn reach_keyframe(&mut self, session: &Session, index: usize) {
        if let Some(text) = &session.anim.keyframes[index].text {
            self.sink.set_narration_text(text);
        }
        self.notify_keyframe(session, index);
    }

    fn notify_keyframe(&mut self, session: &Session, index: usize) {
        let kf = &session.anim.keyframes[index];
        self.events.push(PlaybackEvent::KeyframeReached {
            index,
            timestamp_ms: kf.timestamp_ms,
        });
        if let Some(cb) = self.on_keyframe.as_mut() {
            cb(index, kf);
        }
    }

    fn push_frame(&mut self, session: &Session, frame: &ResolvedFrame, with_text: bool) {
        for (id, pose) in &frame.poses {
            let Some(&handle) = session.characters.get(id) else {
                continue;
            };
            match pose {
                PoseVariant::Joints(joints) => {
                    for (name, p) in joints {
                        self.sink.set_joint_position(handle, name, p.x, p.y);
                    }
                }
                PoseVariant::Segments(parts) => {
                    for (name, part) in parts {
                        match part.shape {
                            PartShape::Line(seg) => {
                                self.sink.set_segment(handle, name, seg, part.stroke_width)
                            }
                            PartShape::Circle(c) => {
                                self.sink.set_circle(handle, name, c, part.stroke_width)
                            }
                        }
                    }
                }
            }
        }
        for (id, state) in &frame.props {
            if let Some(&handle) = session.props.get(id) {
                self.sink.set_prop_transform(handle, *state);
            }
        }
        if with_text {
            if let Some(text) = &frame.text {
                self.sink.set_narration_text(text);
            }
        }
    }

    fn reject(&mut self, op: &str) {
        let err = AnimatorError::no_session(op);
        warn!("{err}");
        self.events.push(PlaybackEvent::Rejected {
            op: op.to_string(),
            reason: err.to_string(),
        });
    }

    // ---------- Queries & export ----------

    pub fn state(&self) -> PlaybackSnapshot {
        let Some(session) = &self.session else {
            return PlaybackSnapshot::empty();
        };
        let now = self.time.now_ms();
        let progress = match session.status {
            PlaybackStatus::Stopped | PlaybackStatus::Starting => 0.0,
            PlaybackStatus::Completed => 1.0,
            PlaybackStatus::Playing | PlaybackStatus::Paused => session.strategy.progress(now),
        };
        let (current_frame, total_frames) = match &session.strategy {
            PlaybackStrategy::Discrete(fs) => (Some(fs.index()), Some(fs.len())),
            PlaybackStrategy::Continuous(_) => (None, None),
        };
        PlaybackSnapshot {
            is_playing: matches!(
                session.status,
                PlaybackStatus::Playing | PlaybackStatus::Starting
            ),
            has_data: true,
            progress,
            current_frame,
            total_frames,
            status: session.status,
            strategy: Some(session.strategy.kind()),
        }
    }

    /// Push keyframe/frame `index` to the sink without touching the clock.
    pub fn render_frame_at(&mut self, index: usize) -> Option<ResolvedFrame> {
        let Some(session) = self.session.take() else {
            self.reject("render_frame_at");
            return None;
        };
        let frame = export::resolve_keyframe(&session.anim, index);
        self.push_frame(&session, &frame, true);
        self.session = Some(session);
        Some(frame)
    }

    /// Resolved state at `time_ms` on the animation's own timeline.
    pub fn resolve_at(&self, time_ms: f64) -> Option<ResolvedFrame> {
        let session = self.session.as_ref()?;
        Some(match &session.strategy {
            PlaybackStrategy::Continuous(tl) => {
                export::resolve_at(&session.anim, tl.segments(), time_ms.clamp(0.0, tl.total_ms()))
            }
            PlaybackStrategy::Discrete(fs) => {
                let first = session.anim.keyframes.first().map_or(0.0, |k| k.timestamp_ms);
                let mut frame = export::resolve_keyframe(&session.anim, fs.index_at(time_ms - first));
                frame.time_ms = time_ms;
                frame
            }
        })
    }

    /// Clock-free frame stream. `fps` defaults to the payload's `target_fps`,
    /// then to the configured export rate.
    pub fn export_frames(&self, fps: Option<f32>) -> Option<FrameStream<'_>> {
        let anim = self.animation()?;
        let fps = fps
            .or(anim.target_fps.map(|f| f as f32))
            .unwrap_or(self.cfg.export_fps);
        Some(FrameStream::new(anim, fps, self.cfg.default_easing))
    }
}

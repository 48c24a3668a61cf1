//! wasm-bindgen wrapper around `stickfig-animation-core`.
//!
//! The host passes a plain JS object implementing the render sink
//! (`createCharacter`, `createProp`, `setJointPosition`, `setSegment`, `setCircle`,
//! `setPropTransform`, `setNarrationText`, `clear`) and drives time itself:
//! call `tick()` every animation frame, or sleep for `pendingTimer().delayMs`
//! and call `fireTimer(token)`.

use js_sys::{Array, Function, Reflect, JSON};
use serde::Serialize;
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use stickfig_animation_core::{
    Character, Circle, CommandQueue, Config, HandleAllocator, PlaybackCommand, PlaybackEngine,
    Prop, PropState, RenderHandle, RenderSink, SeekTarget, Segment, TimeSource, TimerKind,
    TimerToken, ABI_VERSION,
};

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

/// Serialize to plain JS objects (maps become objects, not `Map`s).
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, swb::Error> {
    value.serialize(&swb::Serializer::json_compatible())
}

fn to_js_or_throw<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsError> {
    to_js(value).map_err(|e| JsError::new(&format!("serialize error: {e}")))
}

fn stroke_arg(stroke_width: Option<f32>) -> JsValue {
    stroke_width
        .map(|w| JsValue::from_f64(w as f64))
        .unwrap_or(JsValue::UNDEFINED)
}

/// Render sink backed by a JS object. Handles are allocated on the Rust side and
/// passed to `createCharacter(handle, character)` / `createProp(handle, prop)`.
struct JsSink {
    target: JsValue,
    handles: HandleAllocator,
}

impl JsSink {
    fn new(target: JsValue) -> Self {
        Self {
            target,
            handles: HandleAllocator::new(),
        }
    }

    fn call(&self, method: &str, args: &[JsValue]) {
        let f = match Reflect::get(&self.target, &JsValue::from_str(method)) {
            Ok(f) => f,
            Err(_) => return,
        };
        let Ok(f) = f.dyn_into::<Function>() else {
            log::debug!("render sink has no `{method}` method; skipping");
            return;
        };
        let argv: Array = args.iter().collect();
        if let Err(e) = f.apply(&self.target, &argv) {
            log::warn!("render sink `{method}` threw: {e:?}");
        }
    }
}

impl RenderSink for JsSink {
    fn create_character(&mut self, character: &Character) -> RenderHandle {
        let handle = self.handles.alloc();
        let desc = to_js(character).unwrap_or(JsValue::NULL);
        self.call("createCharacter", &[JsValue::from(handle.0), desc]);
        handle
    }

    fn create_prop(&mut self, prop: &Prop) -> RenderHandle {
        let handle = self.handles.alloc();
        let desc = to_js(prop).unwrap_or(JsValue::NULL);
        self.call("createProp", &[JsValue::from(handle.0), desc]);
        handle
    }

    fn set_joint_position(&mut self, handle: RenderHandle, joint: &str, x: f32, y: f32) {
        self.call(
            "setJointPosition",
            &[
                JsValue::from(handle.0),
                JsValue::from_str(joint),
                JsValue::from_f64(x as f64),
                JsValue::from_f64(y as f64),
            ],
        );
    }

    fn set_segment(
        &mut self,
        handle: RenderHandle,
        part: &str,
        segment: Segment,
        stroke_width: Option<f32>,
    ) {
        let seg = to_js(&segment).unwrap_or(JsValue::NULL);
        self.call(
            "setSegment",
            &[
                JsValue::from(handle.0),
                JsValue::from_str(part),
                seg,
                stroke_arg(stroke_width),
            ],
        );
    }

    fn set_circle(
        &mut self,
        handle: RenderHandle,
        part: &str,
        circle: Circle,
        stroke_width: Option<f32>,
    ) {
        let c = to_js(&circle).unwrap_or(JsValue::NULL);
        self.call(
            "setCircle",
            &[
                JsValue::from(handle.0),
                JsValue::from_str(part),
                c,
                stroke_arg(stroke_width),
            ],
        );
    }

    fn set_prop_transform(&mut self, handle: RenderHandle, transform: PropState) {
        let t = to_js(&transform).unwrap_or(JsValue::NULL);
        self.call("setPropTransform", &[JsValue::from(handle.0), t]);
    }

    fn set_narration_text(&mut self, text: &str) {
        self.call("setNarrationText", &[JsValue::from_str(text)]);
    }

    fn clear(&mut self) {
        self.handles.reset();
        self.call("clear", &[]);
    }
}

/// Wall clock for the browser.
struct DateNowTime;

impl TimeSource for DateNowTime {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimerView {
    token: u32,
    kind: TimerKind,
    due_ms: f64,
    delay_ms: f64,
}

/// Queue handle that stays usable inside `onKeyframeReached`/`onComplete`, where
/// calling back into the animator itself would be a re-entrant borrow.
#[wasm_bindgen]
pub struct StickfigCommands {
    queue: CommandQueue,
}

#[wasm_bindgen]
impl StickfigCommands {
    /// Queue a command such as `"pause"` or `{ seek: { time_ms: 500 } }`.
    pub fn push(&self, cmd: JsValue) -> Result<(), JsError> {
        let cmd: PlaybackCommand =
            swb::from_value(cmd).map_err(|e| JsError::new(&format!("command error: {e}")))?;
        self.queue.push(cmd);
        Ok(())
    }

    pub fn play(&self) {
        self.queue.push(PlaybackCommand::Play);
    }

    pub fn pause(&self) {
        self.queue.push(PlaybackCommand::Pause);
    }

    pub fn resume(&self) {
        self.queue.push(PlaybackCommand::Resume);
    }

    pub fn restart(&self) {
        self.queue.push(PlaybackCommand::Restart);
    }

    #[wasm_bindgen(js_name = seekTime)]
    pub fn seek_time(&self, time_ms: f64) {
        self.queue
            .push(PlaybackCommand::Seek(SeekTarget::TimeMs(time_ms)));
    }

    #[wasm_bindgen(js_name = seekFrame)]
    pub fn seek_frame(&self, index: u32) {
        self.queue
            .push(PlaybackCommand::Seek(SeekTarget::Frame(index as usize)));
    }
}

#[wasm_bindgen]
pub struct StickfigAnimator {
    core: PlaybackEngine<JsSink>,
}

#[wasm_bindgen]
impl StickfigAnimator {
    /// Construct with a render sink object and an optional config
    /// (`{ settle_delay_ms, default_easing, export_fps, skeleton }`).
    #[wasm_bindgen(constructor)]
    pub fn new(sink: JsValue, config: JsValue) -> Result<StickfigAnimator, JsError> {
        console_error_panic_hook::set_once();
        if jsvalue_is_undefined_or_null(&sink) {
            return Err(JsError::new("a render sink object is required"));
        }
        let cfg: Config = if jsvalue_is_undefined_or_null(&config) {
            Config::default()
        } else {
            swb::from_value(config).map_err(|e| JsError::new(&format!("config error: {e}")))?
        };
        Ok(StickfigAnimator {
            core: PlaybackEngine::with_time_source(cfg, JsSink::new(sink), DateNowTime),
        })
    }

    /// Load a payload object, replacing any current session.
    pub fn load(&mut self, payload: JsValue) -> Result<(), JsError> {
        let json_str: String = JSON::stringify(&payload)
            .map_err(|_| JsError::new("payload is not JSON-serializable"))?
            .into();
        self.load_json(&json_str)
    }

    #[wasm_bindgen(js_name = loadJson)]
    pub fn load_json(&mut self, json: &str) -> Result<(), JsError> {
        self.core
            .load_json(json)
            .map_err(|e| JsError::new(&format!("{}: {e}", e.category())))
    }

    pub fn play(&mut self) {
        self.core.play();
    }

    pub fn pause(&mut self) {
        self.core.pause();
    }

    pub fn resume(&mut self) {
        self.core.resume();
    }

    pub fn restart(&mut self) {
        self.core.restart();
    }

    pub fn clear(&mut self) {
        self.core.clear();
    }

    #[wasm_bindgen(js_name = seekTime)]
    pub fn seek_time(&mut self, time_ms: f64) {
        self.core.seek(SeekTarget::TimeMs(time_ms));
    }

    #[wasm_bindgen(js_name = seekFrame)]
    pub fn seek_frame(&mut self, index: u32) {
        self.core.seek(SeekTarget::Frame(index as usize));
    }

    /// Advance to the current time and return the events drained since the last call.
    pub fn tick(&mut self) -> Result<JsValue, JsError> {
        self.core.tick();
        self.drain_events()
    }

    /// `{ token, kind, dueMs, delayMs }` for the armed timer, or `null`.
    #[wasm_bindgen(js_name = pendingTimer)]
    pub fn pending_timer(&self) -> Result<JsValue, JsError> {
        let now = self.core.now_ms();
        match self.core.pending_timer() {
            Some(t) => to_js_or_throw(&TimerView {
                token: t.token.0,
                kind: t.kind,
                due_ms: t.due_ms,
                delay_ms: t.delay_ms(now),
            }),
            None => Ok(JsValue::NULL),
        }
    }

    /// Fire a timer previously read from `pendingTimer()`. Stale tokens are ignored.
    #[wasm_bindgen(js_name = fireTimer)]
    pub fn fire_timer(&mut self, token: u32) -> Result<JsValue, JsError> {
        self.core.fire_timer(TimerToken(token));
        self.drain_events()
    }

    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events(&mut self) -> Result<JsValue, JsError> {
        to_js_or_throw(&self.core.drain_events())
    }

    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsError> {
        to_js_or_throw(&self.core.state())
    }

    /// Push keyframe `index` to the sink without playing; returns the resolved frame.
    #[wasm_bindgen(js_name = renderFrameAt)]
    pub fn render_frame_at(&mut self, index: u32) -> Result<JsValue, JsError> {
        match self.core.render_frame_at(index as usize) {
            Some(frame) => to_js_or_throw(&frame),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = resolveAt)]
    pub fn resolve_at(&self, time_ms: f64) -> Result<JsValue, JsError> {
        match self.core.resolve_at(time_ms) {
            Some(frame) => to_js_or_throw(&frame),
            None => Ok(JsValue::NULL),
        }
    }

    /// Every frame of the animation as an array, sampled at `fps` when continuous.
    #[wasm_bindgen(js_name = exportFrames)]
    pub fn export_frames(&self, fps: Option<f32>) -> Result<JsValue, JsError> {
        match self.core.export_frames(fps) {
            Some(stream) => to_js_or_throw(&stream.collect::<Vec<_>>()),
            None => Ok(JsValue::NULL),
        }
    }

    /// `cb(index, keyframe)` runs synchronously when a keyframe is reached.
    #[wasm_bindgen(js_name = onKeyframeReached)]
    pub fn on_keyframe_reached(&mut self, cb: Function) {
        self.core.on_keyframe_reached(move |index, keyframe| {
            let kf = to_js(keyframe).unwrap_or(JsValue::NULL);
            if let Err(e) = cb.call2(&JsValue::NULL, &JsValue::from(index as u32), &kf) {
                log::warn!("onKeyframeReached threw: {e:?}");
            }
        });
    }

    #[wasm_bindgen(js_name = onComplete)]
    pub fn on_complete(&mut self, cb: Function) {
        self.core.on_complete(move || {
            if let Err(e) = cb.call0(&JsValue::NULL) {
                log::warn!("onComplete threw: {e:?}");
            }
        });
    }

    /// Command queue handle for use inside callbacks.
    pub fn commands(&self) -> StickfigCommands {
        StickfigCommands {
            queue: self.core.commands(),
        }
    }
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    ABI_VERSION
}

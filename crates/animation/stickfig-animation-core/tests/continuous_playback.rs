use std::cell::RefCell;
use std::rc::Rc;

use stickfig_animation_core::{
    Config, ManualTime, PlaybackCommand, PlaybackEngine, PlaybackEvent, PlaybackStatus, Point,
    RecordingSink, SeekTarget, StrategyKind, TimerKind,
};
use stickfig_test_fixtures::animations;

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn walkers() -> (PlaybackEngine<RecordingSink>, ManualTime) {
    let time = ManualTime::new(0.0);
    let mut engine =
        PlaybackEngine::with_time_source(Config::default(), RecordingSink::new(), time.clone());
    let json = animations::json("two-walkers").expect("load two-walkers fixture");
    engine.load_json(&json).expect("two-walkers loads");
    (engine, time)
}

fn head(engine: &PlaybackEngine<RecordingSink>, id: &str) -> Point {
    engine
        .sink()
        .joint(id, "head")
        .unwrap_or_else(|| panic!("{id} head not drawn"))
}

fn reached(engine: &mut PlaybackEngine<RecordingSink>) -> Rc<RefCell<Vec<usize>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    engine.on_keyframe_reached(move |i, _| sink.borrow_mut().push(i));
    seen
}

#[test]
fn two_characters_end_to_end() {
    let (mut engine, time) = walkers();
    let seen = reached(&mut engine);
    let events = engine.drain_events();
    assert!(matches!(
        events.as_slice(),
        [PlaybackEvent::Loaded {
            strategy: StrategyKind::Continuous,
            keyframes: 3,
            characters: 2,
            skipped_poses: 0
        }]
    ));

    engine.play();
    // First pose is pushed synchronously by play().
    assert_eq!(head(&engine, "alice"), Point { x: 200.0, y: 200.0 });
    assert_eq!(engine.sink().narration(), Some("Alice sets off."));

    time.set(500.0);
    engine.tick();
    let state = engine.state();
    assert!(state.is_playing && state.has_data);
    approx(state.progress, 0.25, 1e-6);
    assert_eq!(state.current_frame, None);
    // QuadInOut at the segment midpoint is exactly halfway.
    approx(head(&engine, "alice").x, 300.0, 1e-3);
    // Bob only exists from keyframe 1 on: seeded, not flown in from the origin.
    assert_eq!(head(&engine, "bob"), Point { x: 600.0, y: 200.0 });
    let ball = engine.sink().prop("ball").expect("ball drawn");
    approx(ball.x, 300.0, 1e-3);
    assert!(!ball.visible);

    time.set(1000.0);
    engine.tick();
    assert_eq!(engine.sink().narration(), Some("Bob joins her."));
    assert_eq!(head(&engine, "alice"), Point { x: 400.0, y: 200.0 });

    time.set(2000.0);
    engine.tick();
    time.set(2500.0);
    engine.tick();
    assert_eq!(engine.status(), PlaybackStatus::Completed);
    assert_eq!(engine.state().progress, 1.0);
    assert_eq!(*seen.borrow(), vec![0, 1, 2]);

    let completed = engine
        .drain_events()
        .iter()
        .filter(|e| matches!(e, PlaybackEvent::Completed))
        .count();
    assert_eq!(completed, 1);
}

#[test]
fn seeded_character_holds_target_through_segment() {
    let (mut engine, time) = walkers();
    engine.play();
    for step in 0..10 {
        time.set(step as f64 * 100.0);
        engine.tick();
        assert_eq!(head(&engine, "bob"), Point { x: 600.0, y: 200.0 }, "t={step}00");
    }
}

#[test]
fn pause_is_idempotent_and_freezes_progress() {
    let (mut engine, time) = walkers();
    engine.play();
    time.set(300.0);
    engine.tick();
    engine.pause();
    engine.pause();
    approx(engine.state().progress, 0.15, 1e-6);

    time.set(5000.0);
    engine.tick();
    let state = engine.state();
    assert_eq!(state.status, PlaybackStatus::Paused);
    assert!(!state.is_playing);
    approx(state.progress, 0.15, 1e-6);
    assert!(engine.pending_timer().is_none());

    let pauses = engine
        .drain_events()
        .iter()
        .filter(|e| matches!(e, PlaybackEvent::Paused { .. }))
        .count();
    assert_eq!(pauses, 1);

    engine.resume();
    engine.resume();
    approx(engine.state().progress, 0.15, 1e-6);
    time.set(5100.0);
    engine.tick();
    approx(engine.state().progress, 0.2, 1e-6);
}

#[test]
fn restart_after_complete_waits_for_settle_delay() {
    let (mut engine, time) = walkers();
    engine.play();
    time.set(2000.0);
    engine.tick();
    assert_eq!(engine.status(), PlaybackStatus::Completed);

    engine.restart();
    assert_eq!(engine.status(), PlaybackStatus::Starting);
    assert_eq!(head(&engine, "alice"), Point { x: 200.0, y: 200.0 });
    let timer = engine.pending_timer().expect("settle timer armed");
    assert_eq!(timer.kind, TimerKind::Start);
    assert_eq!(timer.due_ms, 2050.0);

    time.set(2049.0);
    engine.tick();
    assert_eq!(engine.status(), PlaybackStatus::Starting);

    time.set(2050.0);
    engine.tick();
    assert_eq!(engine.status(), PlaybackStatus::Playing);
    assert_eq!(engine.state().progress, 0.0);

    time.set(3050.0);
    engine.tick();
    approx(engine.state().progress, 0.5, 1e-6);
}

#[test]
fn restart_honours_configured_settle_delay() {
    let time = ManualTime::new(0.0);
    let cfg = Config::from_json(r#"{"settle_delay_ms": 120}"#).unwrap();
    let mut engine = PlaybackEngine::with_time_source(cfg, RecordingSink::new(), time.clone());
    engine
        .load_json(&animations::json("two-walkers").unwrap())
        .unwrap();
    engine.restart();
    let timer = engine.pending_timer().unwrap();
    time.set(120.0);
    engine.fire_timer(timer.token);
    assert_eq!(engine.status(), PlaybackStatus::Playing);
}

#[test]
fn seek_from_stopped_lands_paused_without_callbacks() {
    let (mut engine, time) = walkers();
    let seen = reached(&mut engine);

    engine.seek(SeekTarget::TimeMs(1500.0));
    assert_eq!(engine.status(), PlaybackStatus::Paused);
    approx(engine.state().progress, 0.75, 1e-6);
    approx(head(&engine, "alice").x, 450.0, 1e-3);
    assert_eq!(engine.sink().narration(), Some("Bob joins her."));
    assert!(seen.borrow().is_empty());

    engine.resume();
    time.set(500.0);
    engine.tick();
    assert_eq!(engine.status(), PlaybackStatus::Completed);
    assert_eq!(*seen.borrow(), vec![2]);
}

#[test]
fn seek_to_keyframe_index_while_playing() {
    let (mut engine, time) = walkers();
    engine.play();
    time.set(100.0);
    engine.tick();
    engine.seek(SeekTarget::Frame(1));
    assert_eq!(engine.status(), PlaybackStatus::Playing);
    assert_eq!(head(&engine, "alice"), Point { x: 400.0, y: 200.0 });
    approx(engine.state().progress, 0.5, 1e-6);
    // Next wake-up is the last keyframe, 1000 ms of timeline away.
    assert_eq!(engine.pending_timer().map(|t| t.due_ms), Some(1100.0));
}

#[test]
fn stale_timer_tokens_are_ignored() {
    let (mut engine, time) = walkers();
    let seen = reached(&mut engine);
    engine.play();
    let first = engine.pending_timer().expect("step timer armed");
    assert_eq!(first.due_ms, 1000.0);

    engine.pause();
    time.set(1000.0);
    engine.fire_timer(first.token);
    assert_eq!(engine.status(), PlaybackStatus::Paused);
    assert_eq!(*seen.borrow(), vec![0]);

    engine.resume();
    let second = engine.pending_timer().expect("re-armed after resume");
    assert_ne!(first.token, second.token);
    engine.fire_timer(first.token);
    assert_eq!(*seen.borrow(), vec![0]);

    time.set(second.due_ms);
    engine.fire_timer(second.token);
    assert_eq!(*seen.borrow(), vec![0, 1]);
}

#[test]
fn commands_queued_from_callback_apply_after_the_step() {
    let (mut engine, time) = walkers();
    let queue = engine.commands();
    engine.on_keyframe_reached(move |i, kf| {
        if i == 1 {
            assert_eq!(kf.timestamp_ms, 1000.0);
            queue.push(PlaybackCommand::Pause);
        }
    });
    engine.play();
    time.set(1000.0);
    engine.tick();

    assert_eq!(engine.status(), PlaybackStatus::Paused);
    assert_eq!(head(&engine, "alice"), Point { x: 400.0, y: 200.0 });
    let events = engine.drain_events();
    let reached = events
        .iter()
        .position(|e| matches!(e, PlaybackEvent::KeyframeReached { index: 1, .. }))
        .expect("keyframe 1 reported");
    let paused = events
        .iter()
        .position(|e| matches!(e, PlaybackEvent::Paused { .. }))
        .expect("pause applied");
    assert!(reached < paused);
}

#[test]
fn callback_that_replays_forever_is_bounded() {
    let (mut engine, _time) = walkers();
    let queue = engine.commands();
    engine.on_keyframe_reached(move |_, _| queue.push(PlaybackCommand::Play));
    engine.play();
    assert_eq!(engine.status(), PlaybackStatus::Playing);
    assert!(engine.commands().is_empty());
}

#[test]
fn late_tick_reports_every_keyframe_in_order() {
    let (mut engine, time) = walkers();
    let seen = reached(&mut engine);
    engine.play();
    time.set(9000.0);
    engine.tick();
    assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    assert_eq!(engine.status(), PlaybackStatus::Completed);
    assert_eq!(engine.sink().narration(), Some("They wave."));
}

#[test]
fn on_complete_fires_once() {
    let (mut engine, time) = walkers();
    let done = Rc::new(RefCell::new(0));
    let counter = done.clone();
    engine.on_complete(move || *counter.borrow_mut() += 1);
    engine.play();
    time.set(2000.0);
    engine.tick();
    engine.tick();
    engine.resume();
    assert_eq!(*done.borrow(), 1);
}

#[test]
fn pause_during_settle_delay_holds_the_first_pose() {
    let (mut engine, time) = walkers();
    let seen = reached(&mut engine);
    engine.play();
    time.set(1500.0);
    engine.tick();
    seen.borrow_mut().clear();

    engine.restart();
    let settle = engine.pending_timer().expect("settle timer armed");
    time.set(1520.0);
    engine.pause();
    assert_eq!(engine.status(), PlaybackStatus::Paused);
    assert!(engine.pending_timer().is_none());
    assert_eq!(engine.state().progress, 0.0);
    assert_eq!(head(&engine, "alice"), Point { x: 200.0, y: 200.0 });

    // The cancelled settle timer must not start playback.
    time.set(settle.due_ms + 10.0);
    engine.fire_timer(settle.token);
    engine.tick();
    assert_eq!(engine.status(), PlaybackStatus::Paused);
    assert!(seen.borrow().is_empty());

    engine.resume();
    assert_eq!(engine.status(), PlaybackStatus::Playing);
    time.set(settle.due_ms + 10.0 + 1000.0);
    engine.tick();
    approx(engine.state().progress, 0.5, 1e-6);
}

#[test]
fn first_narration_shows_on_play_when_first_keyframe_is_late() {
    let time = ManualTime::new(0.0);
    let mut engine =
        PlaybackEngine::with_time_source(Config::default(), RecordingSink::new(), time.clone());
    engine
        .load_json(
            r#"{"characters":[{"id":"a"}],"keyframes":[
                {"timestamp":500,"text":"start","characters":{"a":{"joints":{"head":{"x":0,"y":0}}}}},
                {"timestamp":1500,"text":"end","characters":{"a":{"joints":{"head":{"x":10,"y":0}}}}}
            ]}"#,
        )
        .unwrap();
    let seen = reached(&mut engine);
    engine.play();
    assert_eq!(engine.sink().narration(), Some("start"));
    assert_eq!(head(&engine, "a"), Point { x: 0.0, y: 0.0 });
    assert!(seen.borrow().is_empty());

    time.set(500.0);
    engine.tick();
    assert_eq!(*seen.borrow(), vec![0]);
}

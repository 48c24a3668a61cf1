use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stickfig_animation_core::{Config, ManualTime, PlaybackEngine, RecordingSink};
use stickfig_test_fixtures::animations;

fn bench_continuous_tick(c: &mut Criterion) {
    let json = animations::json("two-walkers").expect("two-walkers fixture");
    let time = ManualTime::new(0.0);
    let mut engine =
        PlaybackEngine::with_time_source(Config::default(), RecordingSink::new(), time.clone());
    engine.load_json(&json).expect("fixture loads");
    engine.play();

    let mut t = 0.0;
    c.bench_function("continuous_tick_two_walkers", |b| {
        b.iter(|| {
            // Wrap inside the timeline so every iteration blends.
            t = (t + 16.0) % 1990.0;
            time.set(t);
            engine.seek(stickfig_animation_core::SeekTarget::TimeMs(t));
            engine.tick();
            engine.sink_mut().take_calls();
            engine.drain_events();
            black_box(engine.state().progress);
        })
    });
}

fn bench_export(c: &mut Criterion) {
    let json = animations::json("two-walkers").expect("two-walkers fixture");
    let mut engine = PlaybackEngine::new(Config::default(), RecordingSink::new());
    engine.load_json(&json).expect("fixture loads");

    c.bench_function("export_frames_60fps", |b| {
        b.iter(|| {
            let frames = engine.export_frames(Some(60.0)).map_or(0, |s| s.count());
            black_box(frames)
        })
    });
}

criterion_group!(benches, bench_continuous_tick, bench_export);
criterion_main!(benches);

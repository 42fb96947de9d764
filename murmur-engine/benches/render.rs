use criterion::{black_box, criterion_group, criterion_main, Criterion};
use murmur_engine::{EngineConfig, SoundEngine, SoundscapeId};

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_512_frames");
    for id in SoundscapeId::ALL {
        group.bench_function(id.as_str(), |b| {
            let mut engine = SoundEngine::builder(EngineConfig::default()).seed(1).build().unwrap();
            engine.play(id.as_str());
            let mut buf = vec![0.0f32; 512 * engine.channels()];
            b.iter(|| {
                engine.render(&mut buf);
                black_box(buf[0])
            });
        });
    }
    group.finish();
}

fn bench_switch(c: &mut Criterion) {
    c.bench_function("play_switch_rain_fire", |b| {
        let mut engine = SoundEngine::builder(EngineConfig::default()).seed(2).build().unwrap();
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            black_box(engine.play(if flip { "rain" } else { "fire" }))
        });
    });
}

criterion_group!(benches, bench_render, bench_switch);
criterion_main!(benches);

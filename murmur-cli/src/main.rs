//! Murmur CLI: real-time player and offline renderer for ambient soundscapes.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cpal::traits::DeviceTrait;
use murmur_engine::realtime::{self, RealtimeOutput};
use murmur_engine::{
    catalog, EngineBuilder, EngineConfig, JsonFileStore, OfflineContext, SoundEngine,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    list: bool,
    list_devices: bool,
    device_name: Option<String>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    duration_sec: Option<u64>,
    sound: Option<String>,
    sequence: Vec<String>,
    step_sec: Option<u64>,
    volume: Option<f32>,
    render: Option<PathBuf>,
    prefs: Option<PathBuf>,
    seed: Option<u64>,
}

fn parse_args() -> Args {
    let mut a = Args::default();
    for s in std::env::args().skip(1) {
        if s == "--list"         { a.list = true; continue; }
        if s == "--list-devices" { a.list_devices = true; continue; }
        if let Some(rest) = s.strip_prefix("--device=")      { a.device_name = Some(rest.to_string());     continue; }
        if let Some(rest) = s.strip_prefix("--sample-rate=") { a.sample_rate = rest.parse().ok();          continue; }
        if let Some(rest) = s.strip_prefix("--channels=")    { a.channels    = rest.parse().ok();          continue; }
        if let Some(rest) = s.strip_prefix("--duration=")    { a.duration_sec= rest.parse().ok();          continue; }
        if let Some(rest) = s.strip_prefix("--sound=")       { a.sound       = Some(rest.to_string());     continue; }
        if let Some(rest) = s.strip_prefix("--step=")        { a.step_sec    = rest.parse().ok();          continue; }
        if let Some(rest) = s.strip_prefix("--volume=")      { a.volume      = rest.parse().ok();          continue; }
        if let Some(rest) = s.strip_prefix("--render=")      { a.render      = Some(PathBuf::from(rest));  continue; }
        if let Some(rest) = s.strip_prefix("--prefs=")       { a.prefs       = Some(PathBuf::from(rest));  continue; }
        if let Some(rest) = s.strip_prefix("--seed=")        { a.seed        = rest.parse().ok();          continue; }
        if let Some(rest) = s.strip_prefix("--sequence=") {
            a.sequence = rest.split(',').filter(|x| !x.is_empty()).map(str::to_string).collect();
            continue;
        }
        warn!("unknown arg: {s}");
    }
    a
}

/// Soundscapes to play, in order. A lone `--sound` is a one-item sequence.
fn playlist(args: &Args) -> Vec<String> {
    if !args.sequence.is_empty() {
        return args.sequence.clone();
    }
    vec![args.sound.clone().unwrap_or_else(|| "rain".to_string())]
}

fn print_catalog() {
    println!("Soundscapes:");
    for d in catalog() {
        println!("  {:<7} {}  {}", d.id.as_str(), d.icon, d.display_name);
    }
}

fn engine_builder(args: &Args, config: EngineConfig) -> EngineBuilder {
    let mut b = SoundEngine::builder(config);
    if let Some(path) = &args.prefs {
        b = b.prefs(JsonFileStore::new(path));
    }
    if let Some(seed) = args.seed {
        b = b.seed(seed);
    }
    b
}

fn apply_volume(engine: &mut SoundEngine, args: &Args) {
    if let Some(v) = args.volume {
        engine.set_volume(v);
    }
}

/// Render the playlist to a 32-bit float WAV.
fn render_to_wav(args: &Args, path: &Path) -> Result<(), Box<dyn Error>> {
    let config = EngineConfig {
        sample_rate: args.sample_rate.map_or(48_000.0, |sr| sr as f32),
        channels: args.channels.map_or(2, usize::from),
        ..EngineConfig::default()
    };
    let ctx = OfflineContext::new(config.sample_rate, config.channels);
    let mut engine = engine_builder(args, config.clone()).context(ctx).build()?;
    apply_volume(&mut engine, args);

    let spec = hound::WavSpec {
        channels: config.channels as u16,
        sample_rate: config.sample_rate as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;

    let list = playlist(args);
    let total = args.duration_sec.unwrap_or(30);
    let step = args.step_sec.unwrap_or(total / list.len().max(1) as u64).max(1);
    let mut block = vec![0.0f32; 1024 * config.channels];
    let mut written = 0u64;

    for (i, id) in list.iter().cycle().enumerate() {
        if written >= total {
            break;
        }
        if !engine.play(id) {
            warn!(soundscape = %id, "skipping soundscape that failed to start");
        }
        let secs = step.min(total - written);
        let mut frames = secs as usize * config.sample_rate as usize;
        while frames > 0 {
            let n = frames.min(1024);
            let buf = &mut block[..n * config.channels];
            engine.render(buf);
            for &s in buf.iter() {
                writer.write_sample(s)?;
            }
            frames -= n;
        }
        written += secs;
        info!(step = i, soundscape = %id, seconds = secs, "rendered");
    }
    engine.stop();
    writer.finalize()?;
    println!("Wrote {} s to {}", written, path.display());
    Ok(())
}

fn play_live(args: &Args) -> Result<(), Box<dyn Error>> {
    let device = realtime::pick_device(args.device_name.as_deref())?;
    let sup_cfg = realtime::choose_config(&device, args.sample_rate, args.channels)?;

    let output = RealtimeOutput::open(&device, &sup_cfg, engine_builder(args, EngineConfig::default()))?;
    let engine = output.engine();
    apply_volume(&mut engine.lock(), args);

    println!("Using device: {}", device.name()?);
    println!("Stream config: {:?} (sample_format: {:?})", output.stream_config(), sup_cfg.sample_format());
    if let Some(d) = args.duration_sec { println!("Auto-stop after {d} seconds"); }
    println!("Press Ctrl+C to stop…\n");

    let list = playlist(args);
    let step = args.step_sec.map(Duration::from_secs);
    let deadline = args.duration_sec.map(|d| std::time::Instant::now() + Duration::from_secs(d));

    for id in list.iter().cycle() {
        if !output.play(id) {
            if output.is_closed() {
                return Err("output device closed".into());
            }
            warn!(soundscape = %id, "could not start soundscape");
        }
        println!("Playing: {id}  | Volume: {:.2}", engine.lock().volume());

        let hold = match (step, deadline) {
            (Some(s), Some(d)) => s.min(d.saturating_duration_since(std::time::Instant::now())),
            (Some(s), None) => s,
            (None, Some(d)) => d.saturating_duration_since(std::time::Instant::now()),
            (None, None) => loop { std::thread::sleep(Duration::from_millis(500)); },
        };
        std::thread::sleep(hold);
        if deadline.is_some_and(|d| std::time::Instant::now() >= d) {
            break;
        }
    }
    engine.lock().stop();
    // let the master ramp and in-flight bursts settle before the stream drops
    std::thread::sleep(Duration::from_millis(200));
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    let args = parse_args();

    if args.list {
        print_catalog();
        return Ok(());
    }
    if args.list_devices {
        println!("Available output devices:");
        for name in realtime::output_device_names()? {
            println!("- {name}");
        }
        return Ok(());
    }

    println!("murmur: ambient soundscape player\n");

    match &args.render {
        Some(path) => render_to_wav(&args, path),
        None => play_live(&args),
    }
}

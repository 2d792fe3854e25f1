// src/main.rs

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use iota::assets::load_samples_from_dir;
use iota::audio_device::{get_host, get_output_devices};
use iota::audio_engine::scope::{cell_outline, ScopeFrame, ScopeReader, CELL_POINTS};
use iota::audio_engine::AudioEngine;
use iota::audio_io::init_and_run_stream;
use iota::control::{connect, AudioHandle};
use iota::params::{Param, SharedParams};
use iota::settings::{default_settings_path, load_settings, save_settings, AppSettings};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const FRAME_PERIOD: Duration = Duration::from_micros(16_667);
const STATS_PERIOD: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[clap(version, about = "Audio core of the Iota toy.")]
struct Cli {
    /// Settings file. Defaults to AppSettings/settings.json next to the executable.
    #[arg(short, long)]
    settings: Option<PathBuf>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Plays live through the audio interface. Events are read from stdin.
    Play {
        /// Output device name. Overrides the settings file.
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Renders the engine offline to a 16-bit stereo WAV file.
    Render {
        /// Length of the render in seconds.
        #[arg(short = 'n', long, default_value_t = 10.0)]
        seconds: f32,
        /// Output path. Defaults to a timestamped file in the working directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Built-in pattern set to render.
        #[arg(short, long)]
        pattern: Option<usize>,
        /// Fire a random hit every this many seconds.
        #[arg(long)]
        hit_every: Option<f32>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings_path = cli.settings.or_else(default_settings_path);
    let settings = match &settings_path {
        Some(path) => load_settings(path),
        None => AppSettings::default(),
    };

    match cli.command {
        Commands::Devices {} => list_devices(&settings),
        Commands::Play { device } => play(&settings, settings_path.as_deref(), device),
        Commands::Render {
            seconds,
            output,
            pattern,
            hit_every,
        } => {
            let path = output.unwrap_or_else(|| {
                let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
                PathBuf::from(format!("iota_{}.wav", timestamp))
            });
            render(&settings, &path, seconds, pattern, hit_every)
        }
    }
}

fn list_devices(settings: &AppSettings) -> Result<()> {
    let host = get_host(settings.host_name.as_deref())?;
    let devices = get_output_devices(&host)?;
    if devices.is_empty() {
        println!("No output devices found on {}.", host.id().name());
        return Ok(());
    }
    println!("Output devices on {}:", host.id().name());
    for (name, _) in devices {
        println!("- {}", name);
    }
    Ok(())
}

fn build(settings: &AppSettings) -> (AudioEngine, AudioHandle, ScopeReader) {
    let (bank, errors) = load_samples_from_dir(&settings.assets_dir, settings.sample_rate);
    if !errors.is_empty() {
        warn!(
            missing = errors.len(),
            dir = %settings.assets_dir.display(),
            "Some samples could not be loaded"
        );
    }
    info!(loaded = bank.loaded_count(), "Samples ready");
    let params = Arc::new(SharedParams::new());
    params.apply_overrides(&settings.params);
    connect(
        &settings.engine_config(),
        &bank,
        params,
        settings.random_sample_cooldown(),
    )
}

/// One line of stdin input in `play` mode.
#[derive(Debug, Clone, PartialEq)]
enum ConsoleCommand {
    Key(char),
    Random,
    Pattern(usize),
    NewLevel,
    LevelComplete,
    Tempo(f64),
    TicksPerBeat(u32),
    Set(Param, f32),
    Defaults,
    Save,
    Reset,
    Quit,
}

impl ConsoleCommand {
    fn parse(line: &str) -> Result<Option<ConsoleCommand>> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let mut arg = |what: &str| {
            words
                .next()
                .with_context(|| format!("'{}' needs {}", head, what))
        };
        let command = match head {
            "1" | "2" | "3" | "4" => ConsoleCommand::Key(head.chars().next().unwrap_or('1')),
            "r" | "random" => ConsoleCommand::Random,
            "pattern" => ConsoleCommand::Pattern(arg("an index")?.parse()?),
            "level" => match arg("'new' or 'complete'")? {
                "new" => ConsoleCommand::NewLevel,
                "complete" => ConsoleCommand::LevelComplete,
                other => anyhow::bail!("unknown level event '{}'", other),
            },
            "tempo" => ConsoleCommand::Tempo(arg("a bpm value")?.parse()?),
            "ticks" => ConsoleCommand::TicksPerBeat(arg("a tick count")?.parse()?),
            "set" => {
                let name = arg("a parameter name")?;
                let param = Param::from_name(name)
                    .with_context(|| format!("unknown parameter '{}'", name))?;
                ConsoleCommand::Set(param, arg("a value")?.parse()?)
            }
            "defaults" => ConsoleCommand::Defaults,
            "save" => ConsoleCommand::Save,
            "reset" => ConsoleCommand::Reset,
            "q" | "quit" => ConsoleCommand::Quit,
            other => anyhow::bail!("unknown command '{}'", other),
        };
        Ok(Some(command))
    }
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Writes the live parameter values into the settings file at `path`.
fn save_params(settings: &AppSettings, params: &SharedParams, path: &Path) -> Result<()> {
    let settings = AppSettings {
        params: params.snapshot(),
        ..settings.clone()
    };
    save_settings(&settings, path).with_context(|| format!("saving {}", path.display()))?;
    info!(path = %path.display(), "Saved parameters");
    Ok(())
}

/// Applies one console command. Returns `false` when playback should stop.
fn apply(
    handle: &mut AudioHandle,
    command: ConsoleCommand,
    settings: &AppSettings,
    settings_path: Option<&Path>,
) -> bool {
    match command {
        ConsoleCommand::Key(key) => {
            handle.key_pressed(key);
        }
        ConsoleCommand::Random => {
            if handle.play_random_sample().is_none() {
                debug!("Random sample still cooling down");
            }
        }
        ConsoleCommand::Pattern(index) => {
            handle.set_pattern(index);
        }
        ConsoleCommand::NewLevel => {
            handle.event_new_level_loaded();
        }
        ConsoleCommand::LevelComplete => {
            handle.event_level_complete();
        }
        ConsoleCommand::Tempo(bpm) => {
            handle.set_tempo(bpm);
        }
        ConsoleCommand::TicksPerBeat(ticks) => {
            handle.set_ticks_per_beat(ticks);
        }
        ConsoleCommand::Set(param, value) => {
            handle.params().set(param, value);
        }
        ConsoleCommand::Defaults => {
            handle.params().reset_to_defaults();
        }
        ConsoleCommand::Save => match settings_path {
            Some(path) => {
                if let Err(e) = save_params(settings, handle.params(), path) {
                    warn!(error = %e, "Could not save parameters");
                }
            }
            None => warn!("No settings path, parameters not saved"),
        },
        ConsoleCommand::Reset => {
            handle.reset_transport();
        }
        ConsoleCommand::Quit => return false,
    }
    true
}

fn play(
    settings: &AppSettings,
    settings_path: Option<&Path>,
    device: Option<String>,
) -> Result<()> {
    let host = get_host(settings.host_name.as_deref())?;
    let (engine, mut handle, mut scope) = build(settings);
    let xrun_count = Arc::new(AtomicUsize::new(0));
    let device_name = device.or_else(|| settings.output_device.clone());
    let (_stream, stream_info) = init_and_run_stream(
        &host,
        device_name.as_deref(),
        settings.sample_rate,
        Some(settings.buffer_size),
        engine,
        xrun_count.clone(),
    )?;
    info!(
        device = %stream_info.device_name,
        patterns = handle.pattern_count(),
        "Playing. Keys 1-4, r, pattern <n>, level new|complete, tempo <bpm>, ticks <n>, set <param> <value>, defaults, save, reset, quit"
    );

    let lines = spawn_stdin_reader();
    let mut scope_frames = [ScopeFrame::default(); CELL_POINTS];
    let mut last_frame = Instant::now();
    let mut last_stats = Instant::now();
    loop {
        match lines.try_recv() {
            Ok(line) => match ConsoleCommand::parse(&line) {
                Ok(Some(command)) => {
                    if !apply(&mut handle, command, settings, settings_path) {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Could not parse command"),
            },
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => break,
        }

        let now = Instant::now();
        handle.update(now - last_frame);
        last_frame = now;

        let radius = handle.params().get_clamped(Param::CellRadius);
        let count = scope.read_latest(&mut scope_frames);
        let outline = cell_outline(&scope_frames[..count], radius);

        if last_stats.elapsed() >= STATS_PERIOD {
            let stats = handle.stats();
            let extent = outline
                .iter()
                .map(|(x, y)| (x * x + y * y).sqrt())
                .fold(0.0f32, f32::max);
            debug!(
                play_head = stats.play_head.load(Ordering::Relaxed),
                active_set = stats.active_set.load(Ordering::Relaxed),
                cpu_load = stats.cpu_load(),
                xruns = xrun_count.load(Ordering::Relaxed),
                scope_dropped = scope.dropped(),
                cell_extent = extent,
                "Engine status"
            );
            last_stats = Instant::now();
        }
        thread::sleep(FRAME_PERIOD);
    }
    info!("Stopping playback");
    Ok(())
}

fn render(
    settings: &AppSettings,
    path: &Path,
    seconds: f32,
    pattern: Option<usize>,
    hit_every: Option<f32>,
) -> Result<()> {
    if !seconds.is_finite() || seconds <= 0.0 {
        anyhow::bail!("render length must be positive, got {}", seconds);
    }
    let (mut engine, mut handle, _scope) = build(settings);
    if let Some(index) = pattern {
        if !handle.set_pattern(index) {
            anyhow::bail!(
                "pattern {} does not exist, {} are available",
                index,
                handle.pattern_count()
            );
        }
    }

    let sample_rate = settings.sample_rate.max(1);
    let channels = 2usize;
    let block_frames = settings.buffer_size.max(1) as usize;
    let block_period = Duration::from_secs_f64(block_frames as f64 / sample_rate as f64);
    let total_frames = (seconds as f64 * sample_rate as f64).round() as usize;
    let hit_period = hit_every
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(Duration::from_secs_f32);

    let spec = hound::WavSpec {
        channels: channels as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut buffer = vec![0.0f32; block_frames * channels];
    let mut rendered = 0usize;
    let mut since_hit = Duration::ZERO;
    while rendered < total_frames {
        if let Some(period) = hit_period {
            if since_hit >= period {
                handle.play_random_sample();
                since_hit = Duration::ZERO;
            }
        }

        let frames = block_frames.min(total_frames - rendered);
        let block = &mut buffer[..frames * channels];
        engine.audio_out(block, channels);
        for &sample in block.iter() {
            writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }

        rendered += frames;
        handle.update(block_period);
        since_hit += block_period;
    }
    writer.finalize()?;

    info!(
        path = %path.display(),
        seconds,
        frames = rendered,
        "Rendered to file"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_console_commands() {
        assert_eq!(ConsoleCommand::parse("  ").unwrap(), None);
        assert_eq!(ConsoleCommand::parse("3").unwrap(), Some(ConsoleCommand::Key('3')));
        assert_eq!(ConsoleCommand::parse("r").unwrap(), Some(ConsoleCommand::Random));
        assert_eq!(
            ConsoleCommand::parse("pattern 2").unwrap(),
            Some(ConsoleCommand::Pattern(2))
        );
        assert_eq!(
            ConsoleCommand::parse("level complete").unwrap(),
            Some(ConsoleCommand::LevelComplete)
        );
        assert_eq!(
            ConsoleCommand::parse("set master_gain 0.5").unwrap(),
            Some(ConsoleCommand::Set(Param::MasterGain, 0.5))
        );
        assert_eq!(
            ConsoleCommand::parse("defaults").unwrap(),
            Some(ConsoleCommand::Defaults)
        );
        assert_eq!(ConsoleCommand::parse("save").unwrap(), Some(ConsoleCommand::Save));
        assert_eq!(ConsoleCommand::parse("quit").unwrap(), Some(ConsoleCommand::Quit));
    }

    #[test]
    fn test_defaults_and_save_commands() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AppSettings {
            assets_dir: dir.path().to_path_buf(),
            ..AppSettings::default()
        };
        let path = dir.path().join("settings.json");
        let (_engine, mut handle, _scope) = build(&settings);
        let default_gain = handle.params().get(Param::MasterGain);

        let set_gain = ConsoleCommand::Set(Param::MasterGain, 0.25);
        assert!(apply(&mut handle, set_gain, &settings, Some(&path)));
        assert!(apply(&mut handle, ConsoleCommand::Save, &settings, Some(&path)));
        let saved = load_settings(&path);
        assert_eq!(saved.params.get("master_gain"), Some(&0.25));
        assert_eq!(saved.params.len(), Param::ALL.len());
        assert_eq!(saved.assets_dir, settings.assets_dir);

        assert!(apply(&mut handle, ConsoleCommand::Defaults, &settings, Some(&path)));
        assert_eq!(handle.params().get(Param::MasterGain), default_gain);
        assert!(!apply(&mut handle, ConsoleCommand::Quit, &settings, None));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ConsoleCommand::parse("pattern").is_err());
        assert!(ConsoleCommand::parse("pattern x").is_err());
        assert!(ConsoleCommand::parse("level later").is_err());
        assert!(ConsoleCommand::parse("set not_a_param 1").is_err());
        assert!(ConsoleCommand::parse("jump").is_err());
    }

    #[test]
    fn test_render_writes_requested_length() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AppSettings {
            assets_dir: dir.path().to_path_buf(),
            reverb_seed: Some(1),
            ..AppSettings::default()
        };
        let path = dir.path().join("out.wav");
        render(&settings, &path, 0.5, Some(1), Some(0.1)).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, settings.sample_rate);
        assert_eq!(reader.duration(), settings.sample_rate / 2);
    }

    #[test]
    fn test_render_rejects_unknown_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AppSettings {
            assets_dir: dir.path().to_path_buf(),
            ..AppSettings::default()
        };
        assert!(render(&settings, &dir.path().join("out.wav"), 1.0, Some(99), None).is_err());
    }
}

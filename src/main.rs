use serenata::effects::{LogHaptics, LogScrollLock, TerminalRenderer};
use serenata::player::{PlayerState, SimulatedPlayer, VideoPlayer};
use serenata::processor::{plain_text, to_subtitles};
use serenata::serialiser;
use serenata::{CaptionChange, Config, HoldGesture, Stage, StageInput, SyncEvent, Synchronizer};

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    match run() {
        Ok(()) => (),
        Err(err) => {
            eprintln!("An error occurred: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("    {}", cause);
            }
            std::process::exit(1);
        }
    }
}

#[derive(ClapParser)]
#[command(about = "Play captions, phases and the hold-to-unlock gesture along with a song")]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "The TOML configuration to use. Without one, built-in defaults and no captions are used."
    )]
    config: Option<PathBuf>,
    #[arg(short, long, action = clap::ArgAction::Count, help = "Log more; repeat for trace output.")]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the configuration and captions and print a summary.
    Check,
    /// Sample the given playback times and print every change they cause.
    Replay {
        #[arg(
            value_name = "SECONDS",
            required = true,
            value_delimiter = ',',
            allow_negative_numbers = true,
            help = "Playback times in the order they are sampled, e.g. 0,5,5,11,25"
        )]
        times: Vec<f64>,
    },
    /// Play the song on a simulated player and show the captions as they come.
    Play {
        #[arg(long, default_value_t = 1.0, help = "Playback speed of the simulated player.")]
        speed: f64,
        #[arg(long, value_name = "SECONDS", default_value_t = 0.0, help = "Start playing from here.")]
        from: f64,
        #[arg(long, value_name = "SECONDS", help = "Press and hold at this point of the song.")]
        hold_at: Option<f64>,
        #[arg(
            long,
            value_name = "MS",
            requires = "hold_at",
            help = "Let go after this many milliseconds. Defaults to holding long enough to unlock."
        )]
        hold_for: Option<u64>,
        #[arg(long, value_name = "SECONDS", requires = "seek_to", help = "Seek when the song reaches this point.")]
        seek_at: Option<f64>,
        #[arg(long, value_name = "SECONDS", requires = "seek_at", help = "Where to seek to.")]
        seek_to: Option<f64>,
    },
    /// Perform the hold gesture without any music.
    Hold {
        #[arg(long, value_name = "MS", help = "Let go after this many milliseconds instead of holding on.")]
        release_after: Option<u64>,
    },
    /// Write the caption table as an SRT file.
    Export {
        #[arg(
            short,
            long,
            value_name = "FILE",
            help = "The file to write to. If not supplied, the subtitles will be written to standard output.",
            default_value = "-"
        )]
        output: String,
        #[arg(long, value_name = "SECONDS", default_value_t = 4.0, help = "How long the last caption stays up.")]
        tail: f64,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .context(format!("Failed to load configuration: '{}'", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Command::Check => check(&config),
        Command::Replay { times } => replay(&config, &times),
        Command::Play {
            speed,
            from,
            hold_at,
            hold_for,
            seek_at,
            seek_to,
        } => {
            if !(speed.is_finite() && speed > 0.0) {
                return Err(anyhow!("Speed must be a positive number, got {}", speed));
            }
            let hold = match hold_at {
                Some(at) => Some(HoldScript {
                    at: song_delay(at, from, speed)?,
                    release_after: hold_for.map(Duration::from_millis),
                }),
                None => None,
            };
            let seek = match seek_at.zip(seek_to) {
                Some((at, to)) => Some((song_delay(at, from, speed)?, to)),
                None => None,
            };
            let script = Script {
                play_from: Some(from),
                hold,
                seek,
                quit_after: None,
            };
            perform(&config, speed, script)
        }
        Command::Hold { release_after } => {
            let release_after = release_after.map(Duration::from_millis);
            let settle = config.stage_config().fade_in + Duration::from_millis(100);
            let quit_after = release_after.unwrap_or_else(|| config.hold_duration()) + settle;
            let script = Script {
                play_from: None,
                hold: Some(HoldScript {
                    at: Duration::ZERO,
                    release_after,
                }),
                seek: None,
                quit_after: Some(quit_after),
            };
            perform(&config, 1.0, script)
        }
        Command::Export { output, tail } => export(&config, &output, tail),
    }
}

/// How long after the start the song reaches `at` when playing from `from`.
fn song_delay(at: f64, from: f64, speed: f64) -> Result<Duration> {
    let seconds = ((at - from) / speed).max(0.0);
    Duration::try_from_secs_f64(seconds)
        .context(format!("{}s into the song is too far away to wait for", at))
}

fn check(config: &Config) -> Result<()> {
    let captions = config.caption_table().context("Failed to load captions")?;
    let phases = config.phase_table().context("Invalid phase configuration")?;

    println!("{} captions", captions.len());
    if let (Some(first), Some(last)) = (captions.entries().first(), captions.entries().last()) {
        println!("  from {:.2}s to {:.2}s", first.time, last.time);
    }
    for threshold in phases.thresholds() {
        println!("  phase {} from {:.2}s", threshold.phase, threshold.min_time);
    }
    println!(
        "poll every {}ms, hold for {}ms",
        config.poll_interval_ms, config.hold_duration_ms
    );
    Ok(())
}

fn replay(config: &Config, times: &[f64]) -> Result<()> {
    let captions = config.caption_table().context("Failed to load captions")?;
    let phases = config.phase_table().context("Invalid phase configuration")?;
    let mut sync = Synchronizer::new(captions, phases);

    for &time in times {
        for event in sync.sample_at(time) {
            match event {
                SyncEvent::Caption(CaptionChange::Show { index, text }) => {
                    let text = plain_text(&text).replace('\n', " / ");
                    println!("{:>8.2}s  caption #{}  {}", time, index, text);
                }
                SyncEvent::Caption(CaptionChange::Clear) => {
                    println!("{:>8.2}s  caption cleared", time);
                }
                SyncEvent::Phase(phase) => println!("{:>8.2}s  phase {}", time, phase),
            }
        }
    }
    Ok(())
}

fn export(config: &Config, output: &str, tail: f64) -> Result<()> {
    let tail = Duration::try_from_secs_f64(tail)
        .map_err(|_| anyhow!("Tail must be zero or more seconds, got {}", tail))?;
    let captions = config.caption_table().context("Failed to load captions")?;
    let subs = to_subtitles(&captions, tail).context("Failed to convert captions")?;
    if subs.is_empty() {
        return Err(anyhow!("There are no captions to export."));
    }

    if output == "-" {
        serialiser::serialise(&subs, io::stdout())?;
    } else {
        let dst = std::fs::File::create(output)
            .context(format!("Failed to create output file: '{}'", output))?;
        serialiser::serialise(&subs, dst)?;
    }
    Ok(())
}

struct HoldScript {
    at: Duration,
    release_after: Option<Duration>,
}

/// What the simulated visitor does, in wall-clock time from the start.
struct Script {
    play_from: Option<f64>,
    hold: Option<HoldScript>,
    /// When to seek and where to.
    seek: Option<(Duration, f64)>,
    quit_after: Option<Duration>,
}

fn perform(config: &Config, speed: f64, script: Script) -> Result<()> {
    let captions = config.caption_table().context("Failed to load captions")?;
    let phases = config.phase_table().context("Invalid phase configuration")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start the runtime")?;

    runtime.block_on(async {
        let (tx, rx) = mpsc::unbounded_channel();
        let notify_tx = tx.clone();
        let player = SimulatedPlayer::new(config.song_length, speed, move |state| {
            let _ = notify_tx.send(StageInput::Player(state));
            if state == PlayerState::Ended {
                let _ = notify_tx.send(StageInput::Quit);
            }
        });
        if let Some(from) = script.play_from {
            player.seek_to(from);
        }

        let mut stage = Stage::new(
            config.stage_config(),
            Synchronizer::new(captions, phases),
            HoldGesture::new(config.hold_duration(), config.hold_visuals()),
            player,
            TerminalRenderer::new(io::stdout()),
            LogHaptics,
            LogScrollLock::default(),
        );

        let hold_duration = config.hold_duration();
        tokio::join!(stage.run(rx), visit(tx, script, hold_duration));
        info!("Hold gesture ended {:?}", stage.hold().phase());
    });
    Ok(())
}

async fn visit(tx: UnboundedSender<StageInput>, script: Script, hold_duration: Duration) {
    let send = |input| {
        // The stage may already have quit when the song ended.
        let _ = tx.send(input);
    };

    if script.play_from.is_some() {
        send(StageInput::TogglePlayback);
    }

    let mut steps: Vec<(Duration, StageInput)> = Vec::new();
    if let Some(hold) = &script.hold {
        steps.push((hold.at, StageInput::Press));
        let release_after = hold
            .release_after
            .unwrap_or(hold_duration + Duration::from_millis(100));
        steps.push((hold.at + release_after, StageInput::Release));
    }
    if let Some((at, to)) = script.seek {
        steps.push((at, StageInput::Seek(to)));
    }
    if let Some(at) = script.quit_after {
        steps.push((at, StageInput::Quit));
    }
    steps.sort_by_key(|(at, _)| *at);

    let start = tokio::time::Instant::now();
    for (at, input) in steps {
        sleep((start + at).saturating_duration_since(tokio::time::Instant::now())).await;
        send(input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn song_delay_scales_by_speed() {
        assert_eq!(song_delay(30.0, 10.0, 2.0).unwrap(), Duration::from_secs(10));
        assert_eq!(song_delay(5.0, 10.0, 1.0).unwrap(), Duration::ZERO);
    }

    #[test]
    fn unreachable_song_delay_is_an_error() {
        assert!(song_delay(1e20, 0.0, 1.0).is_err());
        assert!(song_delay(f64::INFINITY, 0.0, 1.0).is_err());
    }

    #[test]
    fn huge_export_tail_is_an_error() {
        let config = Config::default();

        assert!(export(&config, "-", 1e20).is_err());
        assert!(export(&config, "-", -1.0).is_err());
    }
}

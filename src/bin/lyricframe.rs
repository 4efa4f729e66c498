use std::{
    io::{BufRead as _, Write as _},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use lyricframe::{
    AudioSource, CancelToken, ExportOptions, ExportPipeline, Fps, LivePreview, LyricCanvas,
    PlaybackClock, Resolution, SettlePolicy, SimulatedTransport, TimedLyric, TimingSession,
    TrackMetadata, VideoStyle,
    timing::timecode::{
        format_time_code, import_subtitles, parse_subtitle_blocks, parse_time_code,
        serialize_subtitle_blocks,
    },
};

#[derive(Parser, Debug)]
#[command(name = "lyricframe", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render an MP4 lyric video (requires `ffmpeg` and `ffprobe` on PATH).
    Render(RenderArgs),
    /// Time a plain-text lyric sheet from stdin commands and write SRT.
    Time(TimeArgs),
    /// Play the timeline against a silent clock and print line changes.
    Preview(PreviewArgs),
    /// Validate an SRT file and optionally write it back normalized.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
struct StyleArgs {
    /// Style JSON. Every field is optional.
    #[arg(long)]
    style: Option<PathBuf>,

    /// Output size, `WIDTHxHEIGHT` (e.g. 1920x1080).
    #[arg(long, value_parser = parse_resolution, default_value = "1280x720")]
    resolution: Resolution,

    /// Font file; overrides the style's font.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Timed lyrics (SRT).
    #[arg(long)]
    lyrics: PathBuf,

    /// Time in seconds.
    #[arg(long)]
    at: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Draw the player overlay.
    #[arg(long)]
    overlay: bool,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Timed lyrics (SRT).
    #[arg(long)]
    lyrics: PathBuf,

    /// Audio track muxed into the video.
    #[arg(long)]
    audio: PathBuf,

    /// Directory the MP4 is written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Frames per second.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Audio bitrate in kbit/s.
    #[arg(long, default_value_t = 192)]
    audio_bitrate: u32,

    /// Wait this long after each seek instead of watching the redraw counter.
    #[arg(long)]
    settle_delay_ms: Option<u64>,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Parser, Debug)]
struct TimeArgs {
    /// Plain-text lyric sheet, one line per lyric.
    #[arg(long)]
    lyrics: PathBuf,

    /// Song length in seconds; shown as the provisional end of the last timed line.
    #[arg(long)]
    duration: Option<f64>,

    /// Output SRT path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Timed lyrics (SRT).
    #[arg(long)]
    lyrics: PathBuf,

    /// Start position in seconds.
    #[arg(long, default_value_t = 0.0)]
    from: f64,

    /// Refreshes per second.
    #[arg(long, default_value_t = 30)]
    rate: u32,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// SRT file to validate.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Write the parsed blocks back out, renumbered.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
        Command::Time(args) => cmd_time(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_resolution(s: &str) -> Result<Resolution, String> {
    Resolution::parse(s).map_err(|e| e.to_string())
}

fn read_lyrics(path: &Path) -> anyhow::Result<Vec<TimedLyric>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read lyrics '{}'", path.display()))?;
    Ok(import_subtitles(&content)?)
}

fn load_style(args: &StyleArgs) -> anyhow::Result<VideoStyle> {
    let mut style = match &args.style {
        Some(path) => VideoStyle::from_json_file(path)?,
        None => VideoStyle::default(),
    };
    if let Some(font) = &args.font {
        style.font = Some(font.clone());
    }
    Ok(style)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let lyrics = read_lyrics(&args.lyrics)?;
    let mut style = load_style(&args.style)?;
    style.show_overlay = args.overlay;
    let duration = lyrics.last().map(|l| l.end_time);
    let matte = style.background;

    let mut canvas = LyricCanvas::new(args.style.resolution, style, lyrics)?;
    if let Some(d) = duration {
        canvas.set_duration(d);
    }
    let frame = canvas.render_at(args.at)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let png = frame.to_png(matte)?;
    std::fs::write(&args.out, png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let lyrics = read_lyrics(&args.lyrics)?;
    let style = load_style(&args.style)?;
    let audio = AudioSource::from_file(&args.audio)?;

    let options = ExportOptions {
        fps: Fps::whole(args.fps)?,
        resolution: args.style.resolution,
        settle: args
            .settle_delay_ms
            .map(|ms| SettlePolicy::FixedDelay(Duration::from_millis(ms)))
            .unwrap_or_default(),
        output_dir: args.out_dir.clone(),
        audio_bitrate_kbps: args.audio_bitrate,
        ..ExportOptions::default()
    };
    let metadata = TrackMetadata {
        title: style.title.clone(),
        artist: style.artist.clone(),
    };

    let mut canvas = LyricCanvas::new(options.resolution, style, lyrics)?;
    canvas.set_duration(audio.duration_secs);
    let mut clock = PlaybackClock::new(SimulatedTransport::new(audio.duration_secs));
    let mut pipeline = ExportPipeline::with_ffmpeg();
    let cancel = CancelToken::new();

    let mut last_percent = None;
    let outcome = pipeline.export_video(
        &mut canvas,
        &mut clock,
        &audio,
        &metadata,
        &options,
        &cancel,
        &mut |message, percent| {
            if last_percent != Some(percent) {
                last_percent = Some(percent);
                eprintln!("[{percent:>3}%] {message}");
            }
        },
    );

    match outcome {
        Ok(outcome) => {
            eprintln!(
                "wrote {} ({} frames, {} bytes)",
                outcome.output_path.display(),
                outcome.frames,
                outcome.bytes
            );
            Ok(())
        }
        Err(e) => {
            if let Some(hint) = e.remediation() {
                eprintln!("hint: {hint}");
            }
            Err(e.into())
        }
    }
}

fn cmd_time(args: TimeArgs) -> anyhow::Result<()> {
    let sheet = std::fs::read_to_string(&args.lyrics)
        .with_context(|| format!("read lyric sheet '{}'", args.lyrics.display()))?;
    let mut session = TimingSession::new(&sheet);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    print_session(&mut stdout, &session, args.duration)?;

    let mut finished = false;
    for line in stdin.lock().lines() {
        let line = line.context("read stdin")?;
        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else {
            continue;
        };
        let outcome = match (cmd, words.next(), words.next()) {
            ("done" | "q", _, _) if session.is_complete() => {
                finished = true;
                break;
            }
            ("done" | "q", _, _) => {
                let missing: Vec<String> = session
                    .missing()
                    .iter()
                    .map(|i| (i + 1).to_string())
                    .collect();
                writeln!(
                    stdout,
                    "not finished: lines {} have no timestamp (`abort` quits without saving)",
                    missing.join(", ")
                )?;
                continue;
            }
            ("abort", _, _) => anyhow::bail!("timing aborted; nothing written"),
            ("show", _, _) => Ok(()),
            ("up", _, _) => {
                session.move_cursor(-1);
                Ok(())
            }
            ("down", _, _) => {
                session.move_cursor(1);
                Ok(())
            }
            ("clear", Some(n), _) => line_index(&session, n).map(|i| session.clear_timestamp(i)),
            ("set", Some(n), Some(t)) => line_index(&session, n).and_then(|i| {
                let t = parse_seconds(t)?;
                report_conflict(session.assign_timestamp(i, t));
                Ok(())
            }),
            (t, None, _) => parse_seconds(t).map(|t| {
                report_conflict(session.assign_at_cursor(t));
            }),
            _ => Err(anyhow::anyhow!(
                "commands: <time> | set <line> <time> | clear <line> | up | down | show | done | abort"
            )),
        };
        if let Err(e) = outcome {
            writeln!(stdout, "error: {e}")?;
        }
        print_session(&mut stdout, &session, args.duration)?;
    }
    if !finished {
        eprintln!("input ended before `done`");
    }

    let lyrics = session.finalize()?;
    std::fs::write(&args.out, serialize_subtitle_blocks(&lyrics))
        .with_context(|| format!("write '{}'", args.out.display()))?;
    eprintln!("wrote {} ({} lines)", args.out.display(), lyrics.len());
    Ok(())
}

fn line_index(session: &TimingSession, n: &str) -> anyhow::Result<usize> {
    let n: usize = n.parse().with_context(|| format!("'{n}' is not a line number"))?;
    if n == 0 || n > session.line_count() {
        anyhow::bail!("line {n} is out of range 1..={}", session.line_count());
    }
    Ok(n - 1)
}

/// Accepts plain seconds (`12.5`) or a time code (`00:00:12,500`).
fn parse_seconds(s: &str) -> anyhow::Result<f64> {
    if let Ok(v) = s.parse::<f64>()
        && v.is_finite()
        && v >= 0.0
    {
        return Ok(v);
    }
    Ok(parse_time_code(s)?)
}

fn report_conflict(conflict: Option<lyricframe::OrderingConflict>) {
    if let Some(c) = conflict {
        eprintln!(
            "warning: line {} is out of order with line {} ({})",
            c.index + 1,
            c.neighbour + 1,
            format_time_code(c.neighbour_time)
        );
    }
}

fn print_session(
    out: &mut impl std::io::Write,
    session: &TimingSession,
    duration: Option<f64>,
) -> anyhow::Result<()> {
    let conflicts = session.ordering_conflicts();
    for (i, (text, ts)) in session
        .lines()
        .iter()
        .zip(session.timestamps())
        .enumerate()
    {
        let marker = if i == session.cursor() { '>' } else { ' ' };
        let time = ts.map(format_time_code).unwrap_or_else(|| "--:--:--,---".into());
        let flag = if conflicts.iter().any(|&(a, b)| a == i || b == i) {
            " !"
        } else {
            ""
        };
        let end = duration
            .and_then(|d| session.provisional_end(i, d))
            .map(|e| format!(" -> {}", format_time_code(e)))
            .unwrap_or_default();
        writeln!(out, "{marker} {:>3} {time}{end} {text}{flag}", i + 1)?;
    }
    out.flush()?;
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let lyrics = read_lyrics(&args.lyrics)?;
    let duration = lyrics.last().map(|l| l.end_time).unwrap_or_default();
    let style = VideoStyle::default();

    let mut clock = PlaybackClock::new(SimulatedTransport::new(duration));
    clock.seek(args.from);
    clock.play();

    let interval = Duration::from_secs_f64(1.0 / f64::from(args.rate.max(1)));
    let texts: Vec<String> = lyrics.iter().map(|l| l.text.clone()).collect();
    let mut preview = LivePreview::new(lyrics, style.ease);
    let frames = preview.run(&mut clock, interval, |tick| {
        if !tick.line_changed {
            return;
        }
        let t = format_time_code(tick.state.time);
        match tick.state.active.and_then(|i| Some((i, texts.get(i)?))) {
            Some((i, text)) => println!("{t} [{}] {text}", i + 1),
            None => println!("{t} ..."),
        }
    });
    eprintln!("{frames} refreshes");
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read '{}'", args.in_path.display()))?;
    let import = parse_subtitle_blocks(&content);
    for skipped in &import.skipped {
        eprintln!("block {}: {}", skipped.position, skipped.reason);
    }
    if import.lyrics.is_empty() {
        anyhow::bail!("no usable subtitle blocks in '{}'", args.in_path.display());
    }

    let session = TimingSession::from_lyrics(&import.lyrics);
    for (a, b) in session.ordering_conflicts() {
        eprintln!("line {} starts before line {}", b + 1, a + 1);
    }
    println!(
        "{} lines, {} skipped blocks",
        import.lyrics.len(),
        import.skipped.len()
    );

    if let Some(out) = &args.out {
        std::fs::write(out, serialize_subtitle_blocks(&import.lyrics))
            .with_context(|| format!("write '{}'", out.display()))?;
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    encode::{Encoder, EncoderLoader, MuxRequest, ffmpeg::FfmpegLoader, probe::probe_audio},
    export::{
        frames::encode_frame_png,
        job::{AUDIO_FILE, ExportJob, OUTPUT_FILE},
        naming::{TrackMetadata, output_file_name},
        progress::{CancelToken, ProgressBands, ProgressReporter},
        settle::{SettlePolicy, settle},
    },
    foundation::{
        core::{Fps, Resolution},
        error::{LyricError, LyricResult},
    },
    playback::{clock::PlaybackClock, transport::AudioTransport},
    style::Rgba8,
    surface::RenderSurface,
};

/// The soundtrack to mux: raw file bytes plus the duration the media layer reported.
#[derive(Clone, Debug)]
pub struct AudioSource {
    pub bytes: Vec<u8>,
    /// May be NaN or infinite when the duration is unknown; exports refuse such sources.
    pub duration_secs: f64,
}

impl AudioSource {
    pub fn new(bytes: Vec<u8>, duration_secs: f64) -> Self {
        Self {
            bytes,
            duration_secs,
        }
    }

    /// Reads `path` and probes its duration.
    pub fn from_file(path: &Path) -> LyricResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read audio '{}'", path.display()))?;
        let probe = probe_audio(path)?;
        Ok(Self::new(bytes, probe.duration_secs))
    }
}

#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub fps: Fps,
    pub resolution: Resolution,
    pub settle: SettlePolicy,
    pub bands: ProgressBands,
    /// Directory the finished MP4 is written to.
    pub output_dir: PathBuf,
    pub audio_bitrate_kbps: u32,
    /// Colour behind any transparent pixels of a captured frame.
    pub matte: Rgba8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            fps: Fps { num: 30, den: 1 },
            resolution: Resolution::HD_720,
            settle: SettlePolicy::default(),
            bands: ProgressBands::default(),
            output_dir: PathBuf::from("."),
            audio_bitrate_kbps: 192,
            matte: Rgba8::BLACK,
        }
    }
}

impl ExportOptions {
    pub fn validate(&self) -> LyricResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        self.resolution.validate()?;
        self.bands.validate()?;
        if self.audio_bitrate_kbps == 0 {
            return Err(LyricError::validation("audio bitrate must be > 0"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOutcome {
    pub output_path: PathBuf,
    pub bytes: u64,
    pub frames: u64,
}

/// Frame-stepping exporter.
///
/// The encoder is loaded on first use and reused by later exports. Each export's files
/// inside the encoder are removed before `export_video` returns, whatever the outcome.
pub struct ExportPipeline {
    loader: Box<dyn EncoderLoader>,
    encoder: Option<Box<dyn Encoder>>,
}

impl ExportPipeline {
    pub fn new(loader: impl EncoderLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            encoder: None,
        }
    }

    /// Pipeline over the system ffmpeg (see [`FfmpegLoader`]).
    pub fn with_ffmpeg() -> Self {
        Self::new(FfmpegLoader::new())
    }

    pub fn is_initialized(&self) -> bool {
        self.encoder.is_some()
    }

    fn encoder(&mut self) -> LyricResult<&mut (dyn Encoder + 'static)> {
        if self.encoder.is_none() {
            let encoder = self.loader.load()?;
            tracing::info!(encoder = %encoder.describe(), "encoder ready");
            self.encoder = Some(encoder);
        }
        self.encoder
            .as_deref_mut()
            .ok_or_else(|| LyricError::encoder_init("encoder unavailable after load"))
    }

    /// Renders every frame of `audio`'s duration from `surface`, muxes them with the audio and
    /// writes the MP4 into `options.output_dir`.
    ///
    /// The clock is taken over for the whole call and handed back paused at zero. The
    /// surface's overlay is hidden while capturing and restored afterwards. Cancellation is
    /// checked before every frame and reported as [`LyricError::ExportCancelled`].
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(
        skip_all,
        fields(fps = %options.fps.ffmpeg_rate(), duration = audio.duration_secs)
    )]
    pub fn export_video<T: AudioTransport>(
        &mut self,
        surface: &mut dyn RenderSurface,
        clock: &mut PlaybackClock<T>,
        audio: &AudioSource,
        metadata: &TrackMetadata,
        options: &ExportOptions,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(&str, u8),
    ) -> LyricResult<ExportOutcome> {
        options.validate()?;
        let mut job = ExportJob::new(audio.duration_secs, options.fps)?;
        if surface.resolution() != options.resolution {
            let r = surface.resolution();
            return Err(LyricError::validation(format!(
                "surface is {}x{} but the export expects {}x{}",
                r.width, r.height, options.resolution.width, options.resolution.height
            )));
        }

        let mut progress = ProgressReporter::new(on_progress);
        progress.report("initializing encoder", 0);
        let encoder = self.encoder()?;

        let overlay_was_visible = surface.overlay_visible();
        surface.set_overlay_visible(false);
        if let Err(e) = clock.begin_export() {
            surface.set_overlay_visible(overlay_was_visible);
            return Err(e);
        }
        tracing::info!(frames = job.total_frames(), "export started");

        let result = run_export(
            encoder,
            surface,
            clock,
            audio,
            metadata,
            options,
            cancel,
            &mut job,
            &mut progress,
        );

        surface.set_overlay_visible(overlay_was_visible);
        let purged = job.purge(encoder);
        clock.end_export();

        if let Err(e) = purged {
            tracing::warn!("dropping encoder after failed cleanup: {e}");
            self.encoder = None;
        }
        match &result {
            Ok(outcome) => tracing::info!(
                output = %outcome.output_path.display(),
                bytes = outcome.bytes,
                "export finished"
            ),
            Err(e) if e.is_cancelled() => tracing::info!("{e}"),
            Err(e) => tracing::warn!("export failed: {e}"),
        }
        result
    }
}

#[allow(clippy::too_many_arguments)]
fn run_export<T: AudioTransport>(
    encoder: &mut dyn Encoder,
    surface: &mut dyn RenderSurface,
    clock: &mut PlaybackClock<T>,
    audio: &AudioSource,
    metadata: &TrackMetadata,
    options: &ExportOptions,
    cancel: &CancelToken,
    job: &mut ExportJob,
    progress: &mut ProgressReporter<'_>,
) -> LyricResult<ExportOutcome> {
    let total = job.total_frames();
    let matte = options.matte.to_array();
    let mut scratch = Vec::with_capacity(options.resolution.byte_len_rgba8());
    progress.report("rendering frames", options.bands.capture_start);

    for frame in 0..total {
        if cancel.is_cancelled() {
            return Err(LyricError::ExportCancelled {
                frames_captured: job.current_frame(),
            });
        }

        let before = surface.generation();
        surface.request_redraw();
        let t = clock.seek(job.frame_time(frame));
        settle(surface, t, before, options.settle)?;

        let captured = surface.capture()?;
        if captured.width != options.resolution.width
            || captured.height != options.resolution.height
        {
            return Err(LyricError::encoding(format!(
                "captured frame is {}x{}, expected {}x{}",
                captured.width,
                captured.height,
                options.resolution.width,
                options.resolution.height
            )));
        }
        let png = encode_frame_png(&captured, matte, &mut scratch)?;
        let name = job.frame_name(frame);
        job.record(name.as_str());
        encoder.write_file(&name, &png)?;
        job.advance();

        tracing::trace!(frame, t, "captured");
        progress.report(
            &format!("rendering frame {}/{total}", frame + 1),
            options.bands.capture_percent(frame + 1, total),
        );
    }
    if cancel.is_cancelled() {
        return Err(LyricError::ExportCancelled {
            frames_captured: job.current_frame(),
        });
    }

    job.record(AUDIO_FILE);
    job.record(OUTPUT_FILE);
    encoder.write_file(AUDIO_FILE, &audio.bytes)?;

    let request = MuxRequest {
        fps: options.fps,
        frame_pattern: job.frame_pattern(),
        audio_file: AUDIO_FILE.to_string(),
        output_file: OUTPUT_FILE.to_string(),
        audio_bitrate_kbps: options.audio_bitrate_kbps,
        duration_secs: audio.duration_secs,
    };
    progress.report("muxing video", options.bands.capture_end);
    encoder.mux(&request, &mut |ratio| {
        progress.report("muxing video", options.bands.mux_percent(ratio));
    })?;

    let data = encoder.read_file(OUTPUT_FILE)?;
    if data.is_empty() {
        return Err(LyricError::encoding("encoder produced an empty output file"));
    }

    std::fs::create_dir_all(&options.output_dir).with_context(|| {
        format!(
            "create output directory '{}'",
            options.output_dir.display()
        )
    })?;
    let output_path = options.output_dir.join(output_file_name(metadata));
    std::fs::write(&output_path, &data)
        .with_context(|| format!("write '{}'", output_path.display()))?;

    progress.report("done", 100);
    Ok(ExportOutcome {
        output_path,
        bytes: data.len() as u64,
        frames: job.current_frame(),
    })
}

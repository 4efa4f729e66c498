use std::path::{Path, PathBuf};

use crate::foundation::error::{LyricError, LyricResult};

/// What the exporter needs to know about an audio file.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioProbe {
    /// NaN when the container does not report a duration.
    pub duration_secs: f64,
    pub codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

/// `LYRICFRAME_FFPROBE` when set, otherwise `ffprobe` from `PATH`.
pub fn ffprobe_binary() -> PathBuf {
    std::env::var_os("LYRICFRAME_FFPROBE")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ffprobe"))
}

#[cfg(feature = "media-ffmpeg")]
pub fn probe_audio(source_path: &Path) -> LyricResult<AudioProbe> {
    let binary = ffprobe_binary();
    let out = std::process::Command::new(&binary)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| {
            LyricError::invalid_media(format!("failed to run '{}': {e}", binary.display()))
        })?;
    if !out.status.success() {
        return Err(LyricError::invalid_media(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    parse_probe_json(&out.stdout)
}

#[cfg(not(feature = "media-ffmpeg"))]
pub fn probe_audio(_source_path: &Path) -> LyricResult<AudioProbe> {
    Err(LyricError::invalid_media(
        "audio probing requires the 'media-ffmpeg' feature",
    ))
}

/// Interprets `ffprobe -print_format json -show_streams -show_format` output.
pub fn parse_probe_json(bytes: &[u8]) -> LyricResult<AudioProbe> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        codec_name: Option<String>,
        sample_rate: Option<String>,
        channels: Option<u16>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(bytes)
        .map_err(|e| LyricError::invalid_media(format!("ffprobe json parse failed: {e}")))?;
    let audio = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .ok_or_else(|| LyricError::invalid_media("no audio stream found"))?;

    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(audio.duration.as_deref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN);

    Ok(AudioProbe {
        duration_secs,
        codec: audio.codec_name.clone(),
        sample_rate: audio.sample_rate.as_deref().and_then(|s| s.parse().ok()),
        channels: audio.channels,
    })
}

use std::{
    collections::HashMap,
    io::{BufRead as _, BufReader, Read as _},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::{
        Mutex, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::Context as _;

use crate::{
    encode::{Encoder, EncoderLoader, MuxRequest, validate_entry_name},
    foundation::error::{LyricError, LyricResult},
};

/// Binary used for encoding: `LYRICFRAME_FFMPEG` when set, otherwise `ffmpeg` from `PATH`.
pub fn ffmpeg_binary() -> PathBuf {
    std::env::var_os("LYRICFRAME_FFMPEG")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ffmpeg"))
}

pub fn is_ffmpeg_available(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn version_cache() -> &'static Mutex<HashMap<PathBuf, String>> {
    static CACHE: OnceLock<Mutex<HashMap<PathBuf, String>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// First line of `<binary> -version`. Successful probes are remembered for the life of the
/// process; failures are retried on the next call.
pub fn probe_version(binary: &Path) -> LyricResult<String> {
    if let Some(v) = version_cache()
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .get(binary)
    {
        return Ok(v.clone());
    }

    let out = Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            LyricError::encoder_init(format!(
                "failed to run '{}' (is ffmpeg installed and on PATH?): {e}",
                binary.display()
            ))
        })?;
    if !out.status.success() {
        return Err(LyricError::encoder_init(format!(
            "'{} -version' exited with status {}",
            binary.display(),
            out.status
        )));
    }

    let version = String::from_utf8_lossy(&out.stdout)
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    tracing::debug!(binary = %binary.display(), %version, "probed encoder");
    version_cache()
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .insert(binary.to_path_buf(), version.clone());
    Ok(version)
}

/// Loads [`FfmpegEncoder`]s backed by a system ffmpeg binary.
#[derive(Clone, Debug)]
pub struct FfmpegLoader {
    binary: PathBuf,
    scratch_root: PathBuf,
}

impl Default for FfmpegLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegLoader {
    pub fn new() -> Self {
        Self {
            binary: ffmpeg_binary(),
            scratch_root: std::env::temp_dir(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Directory under which each encoder creates its private working directory.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl EncoderLoader for FfmpegLoader {
    #[tracing::instrument(skip(self), fields(binary = %self.binary.display()))]
    fn load(&self) -> LyricResult<Box<dyn Encoder>> {
        let version = probe_version(&self.binary)?;
        let encoder = FfmpegEncoder::create(self.binary.clone(), version, &self.scratch_root)?;
        Ok(Box::new(encoder))
    }
}

/// ffmpeg run as a child process over a scratch directory.
///
/// The scratch directory plays the role of the encoder's filesystem and is removed when the
/// encoder is dropped.
pub struct FfmpegEncoder {
    binary: PathBuf,
    version: String,
    workdir: PathBuf,
}

impl FfmpegEncoder {
    fn create(binary: PathBuf, version: String, scratch_root: &Path) -> LyricResult<Self> {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let workdir = scratch_root.join(format!(
            "lyricframe-{}-{nanos}-{}",
            std::process::id(),
            SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&workdir).map_err(|e| {
            LyricError::encoder_init(format!(
                "failed to create encoder scratch dir '{}': {e}",
                workdir.display()
            ))
        })?;
        Ok(Self {
            binary,
            version,
            workdir,
        })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn entry(&self, name: &str) -> LyricResult<PathBuf> {
        validate_entry_name(name)?;
        Ok(self.workdir.join(name))
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.workdir) {
            tracing::debug!(dir = %self.workdir.display(), "scratch cleanup failed: {e}");
        }
    }
}

impl Encoder for FfmpegEncoder {
    fn describe(&self) -> String {
        format!("{} ({})", self.binary.display(), self.version)
    }

    fn write_file(&mut self, name: &str, data: &[u8]) -> LyricResult<()> {
        let path = self.entry(name)?;
        std::fs::write(&path, data).with_context(|| format!("write '{}'", path.display()))?;
        Ok(())
    }

    fn read_file(&mut self, name: &str) -> LyricResult<Vec<u8>> {
        let path = self.entry(name)?;
        Ok(std::fs::read(&path).with_context(|| format!("read '{}'", path.display()))?)
    }

    fn unlink(&mut self, name: &str) -> LyricResult<()> {
        let path = self.entry(name)?;
        std::fs::remove_file(&path).with_context(|| format!("remove '{}'", path.display()))?;
        Ok(())
    }

    fn list_files(&self) -> LyricResult<Vec<String>> {
        let mut names = Vec::new();
        let dir = std::fs::read_dir(&self.workdir)
            .with_context(|| format!("list '{}'", self.workdir.display()))?;
        for entry in dir {
            let entry = entry.with_context(|| format!("list '{}'", self.workdir.display()))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    #[tracing::instrument(skip(self, request, on_ratio), fields(output = %request.output_file))]
    fn mux(&mut self, request: &MuxRequest, on_ratio: &mut dyn FnMut(f64)) -> LyricResult<()> {
        let mut child = Command::new(&self.binary)
            .current_dir(&self.workdir)
            .args(["-y", "-loglevel", "error", "-nostats", "-progress", "pipe:1"])
            .args(request.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                LyricError::encoding(format!(
                    "failed to spawn '{}': {e}",
                    self.binary.display()
                ))
            })?;

        // Drained on a thread so a chatty encoder cannot block on a full stderr pipe.
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut s = String::new();
                let _ = pipe.read_to_string(&mut s);
                s
            })
        });

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else {
                    break;
                };
                if let Some(ratio) = progress_ratio(&line, request.duration_secs) {
                    on_ratio(ratio);
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| LyricError::encoding(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr = stderr
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(LyricError::encoding(format!(
                "ffmpeg exited with status {status}: {}",
                stderr.trim()
            )));
        }
        on_ratio(1.0);
        Ok(())
    }
}

/// Completion ratio from one `-progress` key=value line.
fn progress_ratio(line: &str, duration_secs: f64) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // Both keys carry microseconds.
        "out_time_us" | "out_time_ms" => {
            if !(duration_secs.is_finite() && duration_secs > 0.0) {
                return None;
            }
            let us = value.trim().parse::<i64>().ok()?;
            Some((us as f64 / 1_000_000.0 / duration_secs).clamp(0.0, 1.0))
        }
        "progress" if value.trim() == "end" => Some(1.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_progress_lines() {
        assert_eq!(progress_ratio("out_time_us=5000000", 10.0), Some(0.5));
        assert_eq!(progress_ratio("out_time_ms=20000000", 10.0), Some(1.0));
        assert_eq!(progress_ratio("out_time_us=N/A", 10.0), None);
        assert_eq!(progress_ratio("out_time_us=-1", 10.0), Some(0.0));
        assert_eq!(progress_ratio("progress=continue", 10.0), None);
        assert_eq!(progress_ratio("progress=end", 10.0), Some(1.0));
        assert_eq!(progress_ratio("frame=12", 10.0), None);
        assert_eq!(progress_ratio("out_time_us=100", f64::NAN), None);
    }

    #[test]
    fn missing_binary_is_an_initialization_error() {
        let loader = FfmpegLoader::new().with_binary("/nonexistent/lyricframe-ffmpeg");
        let err = match loader.load() {
            Ok(_) => panic!("load should fail"),
            Err(e) => e,
        };
        assert!(matches!(err, LyricError::EncoderInitialization(_)));
        assert!(err.remediation().is_some());
    }

    #[test]
    fn scratch_dir_is_removed_on_drop() {
        let root = std::env::temp_dir();
        let mut enc =
            FfmpegEncoder::create(PathBuf::from("ffmpeg"), "test".to_string(), &root).unwrap();
        enc.write_file("a.txt", b"hi").unwrap();
        assert_eq!(enc.list_files().unwrap(), vec!["a.txt".to_string()]);
        assert_eq!(enc.read_file("a.txt").unwrap(), b"hi");
        assert!(enc.write_file("../escape", b"x").is_err());
        enc.unlink("a.txt").unwrap();
        assert!(enc.list_files().unwrap().is_empty());

        let dir = enc.workdir().to_path_buf();
        drop(enc);
        assert!(!dir.exists());
    }
}

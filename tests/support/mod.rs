#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    path::PathBuf,
    rc::Rc,
};

use lyricframe::{
    CancelToken, Encoder, EncoderLoader, FrameRGBA, LyricError, LyricResult, MuxRequest,
    RenderSurface, Resolution,
};

/// Fresh scratch directory under `target/` for one test.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("lyricframe-tests").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Surface that paints a flat colour and records every time it drew and captured.
pub struct FakeSurface {
    pub resolution: Resolution,
    pub generation: u64,
    pub pending: bool,
    pub overlay: bool,
    /// When false, `pump` never draws (a stalled surface).
    pub responsive: bool,
    pub drawn_at: Vec<f64>,
    pub captures: u64,
    /// Cancels `token` right after the capture with this 1-based number.
    pub cancel_after: Option<(u64, CancelToken)>,
    /// Overlay state seen at each capture.
    pub overlay_at_capture: Vec<bool>,
}

impl FakeSurface {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            generation: 0,
            pending: false,
            overlay: true,
            responsive: true,
            drawn_at: Vec::new(),
            captures: 0,
            cancel_after: None,
            overlay_at_capture: Vec::new(),
        }
    }
}

impl RenderSurface for FakeSurface {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn request_redraw(&mut self) {
        self.pending = true;
    }

    fn pump(&mut self, t: f64) -> LyricResult<()> {
        if self.responsive && self.pending {
            self.pending = false;
            self.generation += 1;
            self.drawn_at.push(t);
        }
        Ok(())
    }

    fn capture(&mut self) -> LyricResult<FrameRGBA> {
        self.captures += 1;
        self.overlay_at_capture.push(self.overlay);
        if let Some((n, token)) = &self.cancel_after
            && self.captures == *n
        {
            token.cancel();
        }
        let px = [40u8, 80, 120, 255];
        Ok(FrameRGBA {
            width: self.resolution.width,
            height: self.resolution.height,
            data: px.repeat(self.resolution.byte_len_rgba8() / 4),
            premultiplied: true,
        })
    }

    fn overlay_visible(&self) -> bool {
        self.overlay
    }

    fn set_overlay_visible(&mut self, visible: bool) {
        self.overlay = visible;
    }
}

/// Shared state of the in-memory encoder, inspectable after the pipeline drops its handle.
#[derive(Debug, Default)]
pub struct MemFs {
    pub files: BTreeMap<String, Vec<u8>>,
    pub writes: usize,
    pub peak_entries: usize,
    pub muxes: Vec<MuxRequest>,
    pub fail_mux: bool,
    pub fail_unlink: bool,
}

pub struct MemoryEncoder {
    fs: Rc<RefCell<MemFs>>,
}

impl Encoder for MemoryEncoder {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn write_file(&mut self, name: &str, data: &[u8]) -> LyricResult<()> {
        let mut fs = self.fs.borrow_mut();
        fs.files.insert(name.to_string(), data.to_vec());
        fs.writes += 1;
        fs.peak_entries = fs.peak_entries.max(fs.files.len());
        Ok(())
    }

    fn read_file(&mut self, name: &str) -> LyricResult<Vec<u8>> {
        self.fs
            .borrow()
            .files
            .get(name)
            .cloned()
            .ok_or_else(|| LyricError::encoding(format!("no such entry '{name}'")))
    }

    fn unlink(&mut self, name: &str) -> LyricResult<()> {
        let mut fs = self.fs.borrow_mut();
        if fs.fail_unlink {
            return Err(LyricError::encoding("unlink refused"));
        }
        fs.files.remove(name);
        Ok(())
    }

    fn list_files(&self) -> LyricResult<Vec<String>> {
        Ok(self.fs.borrow().files.keys().cloned().collect())
    }

    fn mux(&mut self, request: &MuxRequest, on_ratio: &mut dyn FnMut(f64)) -> LyricResult<()> {
        let mut fs = self.fs.borrow_mut();
        fs.muxes.push(request.clone());
        if fs.fail_mux {
            return Err(LyricError::encoding("mux failed"));
        }
        if !fs.files.contains_key(&request.audio_file) {
            return Err(LyricError::encoding("audio entry missing"));
        }
        let frames = fs.files.keys().filter(|k| k.starts_with("frame")).count();
        on_ratio(0.5);
        fs.files
            .insert(request.output_file.clone(), format!("mp4:{frames}").into_bytes());
        on_ratio(1.0);
        Ok(())
    }
}

/// Loader that counts how often it is asked for an encoder.
#[derive(Clone, Default)]
pub struct CountingLoader {
    pub loads: Rc<Cell<usize>>,
    pub fs: Rc<RefCell<MemFs>>,
    pub fail: bool,
}

impl EncoderLoader for CountingLoader {
    fn load(&self) -> LyricResult<Box<dyn Encoder>> {
        self.loads.set(self.loads.get() + 1);
        if self.fail {
            return Err(LyricError::encoder_init("encoder assets unreachable"));
        }
        Ok(Box::new(MemoryEncoder {
            fs: Rc::clone(&self.fs),
        }))
    }
}

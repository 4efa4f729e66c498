use crate::foundation::error::{LyricError, LyricResult};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> LyricResult<Self> {
        if den == 0 {
            return Err(LyricError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(LyricError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn whole(num: u32) -> LyricResult<Self> {
        Self::new(num, 1)
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Timeline position of a frame. Computed as `frame * den / num` so integer
    /// rates give exact multiples (frame 25 at 25 fps is exactly 1.0).
    pub fn frame_to_secs(self, frame: FrameIndex) -> f64 {
        (frame.0 as f64) * f64::from(self.den) / f64::from(self.num)
    }

    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * self.as_f64()).floor().max(0.0) as u64
    }

    /// Value for ffmpeg's `-framerate`.
    pub fn ffmpeg_rate(self) -> String {
        if self.den == 1 {
            self.num.to_string()
        } else {
            format!("{}/{}", self.num, self.den)
        }
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 25, den: 1 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const HD_720: Self = Self {
        width: 1280,
        height: 720,
    };
    pub const FULL_HD_1080: Self = Self {
        width: 1920,
        height: 1080,
    };

    pub fn new(width: u32, height: u32) -> LyricResult<Self> {
        let r = Self { width, height };
        r.validate()?;
        Ok(r)
    }

    pub fn validate(self) -> LyricResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(LyricError::validation(
                "resolution width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // yuv420p needs even dimensions.
            return Err(LyricError::validation(
                "resolution width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(LyricError::validation("resolution exceeds 65535 pixels"));
        }
        Ok(())
    }

    /// Parses `720p`, `1080p` or `WIDTHxHEIGHT`.
    pub fn parse(s: &str) -> LyricResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "720p" => Ok(Self::HD_720),
            "1080p" => Ok(Self::FULL_HD_1080),
            other => {
                let (w, h) = other.split_once('x').ok_or_else(|| {
                    LyricError::validation(format!(
                        "resolution '{s}' is not 720p, 1080p or WIDTHxHEIGHT"
                    ))
                })?;
                let w = w
                    .parse::<u32>()
                    .map_err(|e| LyricError::validation(format!("bad width in '{s}': {e}")))?;
                let h = h
                    .parse::<u32>()
                    .map_err(|e| LyricError::validation(format!("bad height in '{s}': {e}")))?;
                Self::new(w, h)
            }
        }
    }

    pub fn byte_len_rgba8(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::HD_720
    }
}

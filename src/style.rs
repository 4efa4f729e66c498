//! Explicit styling for the canvas and the exporter.
//!
//! A [`VideoStyle`] is a plain value: the canvas and the export options receive it as an
//! argument, nothing reads styling from shared state. Every field has a default so a JSON
//! file only needs the keys it changes.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    foundation::error::{LyricError, LyricResult},
    render::{
        ease::Ease,
        model::{HighlightMode, WindowMode},
    },
};

/// Straight-alpha RGBA8 colour, serialized as `#RRGGBB` or `#RRGGBBAA`.
///
/// Also the brush type of text layouts; the default is transparent black.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn parse_hex(s: &str) -> LyricResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| LyricError::validation(format!("invalid hex colour '{s}'")))
        };
        match hex.len() {
            6 if hex.is_ascii() => Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 if hex.is_ascii() => Ok(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(LyricError::validation(format!(
                "colour '{s}' must be #RRGGBB or #RRGGBBAA"
            ))),
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl TryFrom<String> for Rgba8 {
    type Error = LyricError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hex(&value)
    }
}

impl From<Rgba8> for String {
    fn from(c: Rgba8) -> Self {
        if c.a == 255 {
            format!("#{:02X}{:02X}{:02X}", c.r, c.g, c.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", c.r, c.g, c.b, c.a)
        }
    }
}

/// Text colours of one theme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    /// Sung part of the active line.
    pub active: Rgba8,
    /// Inactive lines within one and a half slots of the centre.
    pub inactive_near: Rgba8,
    /// Remaining inactive lines and the unsung part of the active line.
    pub inactive_far: Rgba8,
    pub info: Rgba8,
    pub sub_info: Rgba8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Colorized,
    Sunset,
    Ocean,
    Neon,
    Sakura,
}

impl Theme {
    pub const ALL: [Theme; 7] = [
        Theme::Light,
        Theme::Dark,
        Theme::Colorized,
        Theme::Sunset,
        Theme::Ocean,
        Theme::Neon,
        Theme::Sakura,
    ];

    pub fn palette(self) -> Palette {
        // (active, near, far, info, sub_info)
        let (a, n, f, i, s) = match self {
            Self::Light => (0xFFFFFF, 0xE5E7EB, 0xD1D5DB, 0xFFFFFF, 0xE5E7EB),
            Self::Dark => (0x1F2937, 0x4B5563, 0x6B7280, 0x1F2937, 0x4B5563),
            Self::Colorized => (0xFBBF24, 0xFFFFFF, 0xE5E7EB, 0xFBBF24, 0xFFFFFF),
            Self::Sunset => (0xFDBA74, 0xFED7AA, 0xFFEDD5, 0xFDBA74, 0xFED7AA),
            Self::Ocean => (0x7DD3FC, 0xBAE6FD, 0xE0F2FE, 0x7DD3FC, 0xBAE6FD),
            Self::Neon => (0xEC4899, 0xF9A8D4, 0xFBCFE8, 0xEC4899, 0xF9A8D4),
            Self::Sakura => (0xF9A8D4, 0xFBCFE8, 0xFCE7F3, 0xF9A8D4, 0xFBCFE8),
        };
        Palette {
            active: hex_rgb(a),
            inactive_near: hex_rgb(n),
            inactive_far: hex_rgb(f),
            info: hex_rgb(i),
            sub_info: hex_rgb(s),
        }
    }
}

const fn hex_rgb(v: u32) -> Rgba8 {
    Rgba8::rgb((v >> 16) as u8, (v >> 8) as u8, v as u8)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    #[default]
    Right,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AlbumArt {
    pub enabled: bool,
    /// Edge length of the square cover, in percent of the frame height.
    pub size_percent: f32,
    pub side: Side,
    /// Cover image; falls back to the background image when unset.
    pub image: Option<PathBuf>,
}

impl Default for AlbumArt {
    fn default() -> Self {
        Self {
            enabled: true,
            size_percent: 38.0,
            side: Side::Right,
            image: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VideoStyle {
    pub title: String,
    pub artist: String,
    pub theme: Theme,
    /// Lyric font size at 1080p; scaled with the output height.
    pub font_size: f32,
    /// TTF/OTF used for every text element. Text is skipped when unset.
    pub font: Option<PathBuf>,
    pub stroke_width: f32,
    pub stroke_color: Rgba8,
    pub highlight: HighlightMode,
    pub window: WindowMode,
    pub ease: Ease,
    pub background: Rgba8,
    pub background_image: Option<PathBuf>,
    pub album_art: AlbumArt,
    /// Player controls drawn over the preview. Always hidden while exporting.
    pub show_overlay: bool,
}

impl Default for VideoStyle {
    fn default() -> Self {
        Self {
            title: String::new(),
            artist: String::new(),
            theme: Theme::default(),
            font_size: 48.0,
            font: None,
            stroke_width: 0.0,
            stroke_color: Rgba8::BLACK,
            highlight: HighlightMode::default(),
            window: WindowMode::default(),
            ease: Ease::default(),
            background: Rgba8::rgb(18, 20, 28),
            background_image: None,
            album_art: AlbumArt::default(),
            show_overlay: true,
        }
    }
}

impl VideoStyle {
    pub fn palette(&self) -> Palette {
        self.theme.palette()
    }

    pub fn validate(&self) -> LyricResult<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(LyricError::validation("font_size must be finite and > 0"));
        }
        if !self.stroke_width.is_finite() || self.stroke_width < 0.0 {
            return Err(LyricError::validation(
                "stroke_width must be finite and >= 0",
            ));
        }
        let art = self.album_art.size_percent;
        if !art.is_finite() || art <= 0.0 || art > 100.0 {
            return Err(LyricError::validation(
                "album_art.size_percent must be in (0, 100]",
            ));
        }
        Ok(())
    }

    /// Reads a JSON style file. Relative paths inside it resolve against the file's directory.
    pub fn from_json_file(path: &Path) -> LyricResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read style '{}'", path.display()))?;
        let mut style: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse style JSON '{}'", path.display()))?;
        if let Some(root) = path.parent() {
            style.resolve_paths(root);
        }
        style.validate()?;
        Ok(style)
    }

    fn resolve_paths(&mut self, root: &Path) {
        for p in [
            &mut self.font,
            &mut self.background_image,
            &mut self.album_art.image,
        ]
        .into_iter()
        .flatten()
        {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        }
    }
}

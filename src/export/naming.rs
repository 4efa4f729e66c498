/// Stem used when the metadata sanitizes to nothing.
pub const FALLBACK_STEM: &str = "lyric-video";

/// Track information shown in the video and used to name the output file.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
}

/// Lowercases ASCII letters and replaces every other character outside `[a-z0-9]` with `_`,
/// one underscore per character.
pub fn sanitize_stem(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// `<title>.mp4` with the title sanitized, or [`FALLBACK_STEM`] when the title is blank.
pub fn output_file_name(meta: &TrackMetadata) -> String {
    let title = meta.title.trim();
    if title.is_empty() {
        format!("{FALLBACK_STEM}.mp4")
    } else {
        format!("{}.mp4", sanitize_stem(title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_each_character() {
        assert_eq!(sanitize_stem("Hello, World!"), "hello__world_");
        assert_eq!(sanitize_stem("AC/DC"), "ac_dc");
        assert_eq!(sanitize_stem("Été 2024"), "_t__2024");
        assert_eq!(sanitize_stem("夜に駆ける"), "_____");
    }

    #[test]
    fn output_name_uses_the_title_only() {
        let meta = TrackMetadata {
            title: "Love Story".into(),
            artist: "Taylor Swift".into(),
        };
        assert_eq!(output_file_name(&meta), "love_story.mp4");

        let padded = TrackMetadata {
            title: "  Intro ".into(),
            ..TrackMetadata::default()
        };
        assert_eq!(output_file_name(&padded), "intro.mp4");

        let artist_only = TrackMetadata {
            title: " ".into(),
            artist: "YOASOBI".into(),
        };
        assert_eq!(output_file_name(&artist_only), "lyric-video.mp4");
        assert_eq!(
            output_file_name(&TrackMetadata::default()),
            "lyric-video.mp4"
        );
    }
}

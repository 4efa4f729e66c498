pub mod lyric;
pub mod session;
pub mod timecode;

//! Offline export: step the clock frame by frame, capture the surface, and mux the frames
//! with the soundtrack into an MP4.

pub(crate) mod frames;
pub mod job;
pub mod naming;
pub mod pipeline;
pub mod progress;
pub mod settle;

pub use job::ExportJob;
pub use naming::{TrackMetadata, output_file_name, sanitize_stem};
pub use pipeline::{AudioSource, ExportOptions, ExportOutcome, ExportPipeline};
pub use progress::{CancelToken, ProgressBands};
pub use settle::SettlePolicy;

//! Media extraction: the `yt-dlp` driver, mirror providers and the fallback chain

pub mod chain;
pub mod mirror;
pub mod traits;
pub mod ytdlp;

pub use chain::{Extraction, FallbackChain};
pub use mirror::{InvidiousExtractor, PipedExtractor};
pub use traits::{DownloadRequest, MediaExtractor, ProgressCallback, Route};
pub use ytdlp::YtDlpExtractor;

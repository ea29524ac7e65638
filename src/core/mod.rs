//! Core functionality for ytgrab

pub mod downloader;
pub mod links;
pub mod progress;
pub mod selector;
pub mod video_info;

pub use downloader::*;
pub use links::*;
pub use progress::*;
pub use selector::*;
pub use video_info::*;

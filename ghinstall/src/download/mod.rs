//! Asset download to local files.
//!
//! - `persist`: streams an asset from a [`ReleaseSource`](crate::release::ReleaseSource)
//!   into a file, cleaning up after failures
//! - `progress`: byte progress observer

mod persist;
mod progress;

pub use persist::{AssetDownloader, DownloadedFile};
pub use progress::{DownloadProgress, NoProgress};

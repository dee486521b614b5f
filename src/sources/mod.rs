pub mod netease;

use anyhow::Result;

use crate::models::Track;

/// Music catalog source trait.
/// Abstracts search, cover art and audio fetching behind one seam so the
/// UI and downloader never see provider-specific request details.
pub trait MusicSource {
    /// Human-readable source name.
    fn name(&self) -> &str;
    /// Search tracks by keyword. The keyword is assumed non-empty;
    /// callers treat an empty keyword as a no-op before dispatching.
    fn search(&self, keyword: &str) -> Result<Vec<Track>>;
    /// Download a track's cover image as raw bytes.
    fn fetch_cover(&self, track: &Track) -> Result<Vec<u8>>;
    /// Download raw bytes from an audio URL.
    fn fetch_audio(&self, url: &str) -> Result<Vec<u8>>;
}

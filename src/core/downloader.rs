use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::models::Track;
use crate::sources::MusicSource;

/// Replace characters that are unsafe in filenames with `_`.
pub fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c == '/' || c == '\0' {
                return '_';
            }
            if cfg!(target_os = "windows") {
                if matches!(c, '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                    return '_';
                }
                if c.is_ascii_control() {
                    return '_';
                }
            }
            if cfg!(target_os = "macos") && c == ':' {
                return '_';
            }
            c
        })
        .collect()
}

/// Second-resolution local timestamp, `yyyyMMddHHmmss`.
/// Keeps download filenames unique per attempt; two downloads of the same
/// track within the same second may still collide.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Build the `{title}-{artist}-{timestamp}` file stem for a track.
pub fn build_filename(track: &Track, timestamp: &str) -> String {
    format!(
        "{}-{}-{}",
        sanitize_filename(&track.title),
        sanitize_filename(&track.artist),
        timestamp
    )
}

/// Write audio bytes to `<dir>/<stem>.mp3`, creating the directory if it
/// does not exist yet. One write call, no partial files on fetch failure
/// since the full body is already in memory.
pub fn save_audio(dir: &Path, stem: &str, data: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let path = dir.join(format!("{}.mp3", stem));
    std::fs::write(&path, data)
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(path)
}

/// Fetch a track's audio and save it under `out_dir`.
/// A track without an audio URL is skipped silently (`Ok(None)`); a failed
/// fetch aborts before anything touches the filesystem.
pub fn download_track(
    source: &dyn MusicSource,
    track: &Track,
    out_dir: &Path,
) -> Result<Option<PathBuf>> {
    if !track.is_downloadable() {
        log::info!("skipping download, no audio URL: {}", track.summary());
        return Ok(None);
    }

    let data = source.fetch_audio(&track.audio_url)?;
    let stem = build_filename(track, &timestamp());
    let path = save_audio(out_dir, &stem, &data)?;

    log::info!("saved {} ({} bytes)", path.display(), data.len());
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    /// Source stub that serves canned audio bytes and records fetches.
    struct FakeSource {
        audio: Result<Vec<u8>, String>,
        fetches: Cell<usize>,
    }

    impl FakeSource {
        fn ok(bytes: &[u8]) -> Self {
            Self {
                audio: Ok(bytes.to_vec()),
                fetches: Cell::new(0),
            }
        }

        fn failing(msg: &str) -> Self {
            Self {
                audio: Err(msg.to_string()),
                fetches: Cell::new(0),
            }
        }
    }

    impl MusicSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        fn search(&self, _keyword: &str) -> Result<Vec<Track>> {
            Ok(Vec::new())
        }

        fn fetch_cover(&self, _track: &Track) -> Result<Vec<u8>> {
            anyhow::bail!("no cover")
        }

        fn fetch_audio(&self, _url: &str) -> Result<Vec<u8>> {
            self.fetches.set(self.fetches.get() + 1);
            match &self.audio {
                Ok(data) => Ok(data.clone()),
                Err(msg) => anyhow::bail!("{}", msg),
            }
        }
    }

    fn track(title: &str, artist: &str, audio_url: &str) -> Track {
        Track {
            id: "1".to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            cover_url: String::new(),
            audio_url: audio_url.to_string(),
        }
    }

    #[test]
    fn test_sanitize_filename_replaces_separators() {
        assert_eq!(sanitize_filename("a/b\0c"), "a_b_c");
        assert_eq!(sanitize_filename("Hello World"), "Hello World");
    }

    #[test]
    fn test_timestamp_is_fourteen_digits() {
        let ts = timestamp();
        assert_eq!(ts.len(), 14);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_build_filename_format() {
        let t = track("Song", "Artist", "u");
        assert_eq!(build_filename(&t, "20240101120000"), "Song-Artist-20240101120000");
    }

    #[test]
    fn test_build_filename_sanitizes_fields() {
        let t = track("A/B", "C\0D", "u");
        assert_eq!(build_filename(&t, "20240101120000"), "A_B-C_D-20240101120000");
    }

    #[test]
    fn test_save_audio_creates_directory_and_exact_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("PastKing");
        let bytes = b"fake mp3 bytes";

        let path = save_audio(&out, "Song-Artist-20240101120000", bytes).unwrap();

        assert_eq!(path, out.join("Song-Artist-20240101120000.mp3"));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);

        // Creating the directory again is idempotent.
        save_audio(&out, "other", b"x").unwrap();
    }

    #[test]
    fn test_download_skips_empty_url_without_fetching() {
        let tmp = tempfile::tempdir().unwrap();
        let source = FakeSource::ok(b"audio");
        let t = track("Song", "Artist", "");

        let result = download_track(&source, &t, tmp.path()).unwrap();

        assert!(result.is_none());
        assert_eq!(source.fetches.get(), 0);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_download_writes_fetched_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let bytes = b"ID3\x04full audio body";
        let source = FakeSource::ok(bytes);
        let t = track("Song", "Artist", "http://example.com/a.mp3");

        let path = download_track(&source, &t, tmp.path()).unwrap().unwrap();

        assert_eq!(source.fetches.get(), 1);
        assert!(path.extension().is_some_and(|e| e == "mp3"));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("Song-Artist-"));
    }

    #[test]
    fn test_failed_fetch_creates_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("PastKing");
        let source = FakeSource::failing("HTTP 404");
        let t = track("Song", "Artist", "http://example.com/a.mp3");

        assert!(download_track(&source, &t, &out).is_err());
        assert!(!out.exists());
    }
}

/// Parsed metadata for one searchable song. Immutable once created; the
/// result list owning these is replaced wholesale on every new search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub cover_url: String,
    pub audio_url: String,
}

impl Track {
    pub fn summary(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    /// A track without an audio URL can be listed but not downloaded.
    pub fn is_downloadable(&self) -> bool {
        !self.audio_url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let track = Track {
            title: "Blueming".to_string(),
            artist: "IU".to_string(),
            ..Default::default()
        };
        assert_eq!(track.summary(), "IU - Blueming");
    }

    #[test]
    fn test_downloadable_requires_audio_url() {
        let mut track = Track::default();
        assert!(!track.is_downloadable());
        track.audio_url = "http://example.com/a.mp3".to_string();
        assert!(track.is_downloadable());
    }
}

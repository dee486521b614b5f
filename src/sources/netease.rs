use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::Track;
use crate::sources::MusicSource;

/// Default aggregator endpoint. Searches are scoped to the netease catalog
/// via the `type` form field.
pub const DEFAULT_ENDPOINT: &str = "https://music.haom.ren/";

/// Client for the netease search aggregator.
/// One form-encoded POST per search, plain GETs for covers and audio.
pub struct NeteaseClient {
    client: reqwest::blocking::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<ApiSong>>,
}

#[derive(Deserialize)]
struct ApiSong {
    #[serde(default)]
    songid: SongId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    pic: String,
    #[serde(default)]
    url: String,
}

/// The provider sends `songid` as either a JSON number or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum SongId {
    Num(i64),
    Text(String),
}

impl Default for SongId {
    fn default() -> Self {
        SongId::Text(String::new())
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SongId::Num(n) => write!(f, "{}", n),
            SongId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl NeteaseClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    fn convert_song(song: ApiSong) -> Track {
        Track {
            id: song.songid.to_string(),
            title: song.title,
            artist: song.author,
            cover_url: song.pic,
            audio_url: song.url,
        }
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let data = self
            .client
            .get(url)
            .send()
            .context("request failed")?
            .error_for_status()
            .context("request rejected")?
            .bytes()
            .context("failed to read response body")?
            .to_vec();

        Ok(data)
    }
}

/// Decode a search response body. A missing, null or empty `data` key is a
/// valid empty result; malformed JSON is an error the caller absorbs.
fn parse_search_body(body: &str) -> Result<Vec<Track>> {
    let resp: SearchResponse =
        serde_json::from_str(body).context("failed to parse search response")?;

    Ok(resp
        .data
        .unwrap_or_default()
        .into_iter()
        .map(NeteaseClient::convert_song)
        .collect())
}

impl MusicSource for NeteaseClient {
    fn name(&self) -> &str {
        "netease"
    }

    fn search(&self, keyword: &str) -> Result<Vec<Track>> {
        let body = self
            .client
            .post(&self.endpoint)
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&[
                ("input", keyword),
                ("filter", "name"),
                ("type", "netease"),
                ("page", "1"),
            ])
            .send()
            .context("search request failed")?
            .error_for_status()
            .context("search request rejected")?
            .text()
            .context("failed to read search response")?;

        parse_search_body(&body)
    }

    fn fetch_cover(&self, track: &Track) -> Result<Vec<u8>> {
        if track.cover_url.is_empty() {
            anyhow::bail!("track has no cover URL");
        }
        self.fetch_bytes(&track.cover_url)
            .context("cover download failed")
    }

    fn fetch_audio(&self, url: &str) -> Result<Vec<u8>> {
        self.fetch_bytes(url).context("audio download failed")
    }
}

//! # YouTube Adapter
//!
//! Live detection without the Data API, in two steps:
//!
//! 1. **Latest video** from the channel's public Atom feed. This step is
//!    load-bearing; if the feed cannot be fetched the lookup fails.
//! 2. **Live confirmation** from the channel's `/live` page. Best effort:
//!    any failure here, or a page without a recognisable live-signal, just
//!    means "not live".
//!
//! The live-signal is a heuristic over third-party markup with no stability
//! guarantee. [`detect_live`] is the only place that knows its shape.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use super::{LiveSource, SourceError};
use crate::models::{is_blank, SourceResult};
use crate::retrieve::{ApiClient, ClientOptions, HttpError};

static FEED_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<link[^>]*?href="([^"]+)""#).unwrap());
static FEED_VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<yt:videoId>([A-Za-z0-9_-]+)</yt:videoId>").unwrap());
static VIDEO_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:v=|shorts/)([A-Za-z0-9_-]+)").unwrap());
static CANONICAL_WATCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<link rel="canonical" href="https://www\.youtube\.com/watch\?v=([A-Za-z0-9_-]+)""#).unwrap()
});
static IS_LIVE_NOW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""isLiveNow"\s*:\s*(true|false)"#).unwrap());
static IS_LIVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""isLive"\s*:\s*true"#).unwrap());
static IS_UPCOMING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""isUpcoming"\s*:\s*true"#).unwrap());

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:126.0) Gecko/20100101 Firefox/126.0";

/// Endpoints and timeouts for the YouTube lookups.
#[derive(Debug, Clone)]
pub struct YoutubeConfig {
    /// Site root, normally `https://www.youtube.com/`.
    pub base: String,
    /// Timeout for the video feed.
    pub feed_timeout: Duration,
    /// Timeout for the `/live` page, independent of the feed.
    pub live_timeout: Duration,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            base: "https://www.youtube.com/".to_string(),
            feed_timeout: Duration::from_secs(10),
            live_timeout: Duration::from_secs(10),
        }
    }
}

/// What the `/live` page said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveSignal {
    /// Broadcasting now; carries the watch id when the page exposed one.
    Live(Option<String>),
    /// A scheduled broadcast that has not started.
    Upcoming,
    /// The page states explicitly that nothing is live.
    NotLive,
    /// No recognisable signal in the markup.
    Absent,
}

/// Reads the live-signal out of a `/live` page.
///
/// Precedence: an upcoming flag wins, then an explicit live flag, then an
/// explicit not-live flag, and finally the canonical watch link.
pub fn detect_live(html: &str) -> LiveSignal {
    let canonical = CANONICAL_WATCH
        .captures(html)
        .map(|c| c[1].to_string());

    if IS_UPCOMING.is_match(html) {
        return LiveSignal::Upcoming;
    }
    if let Some(flag) = IS_LIVE_NOW.captures(html) {
        return if &flag[1] == "true" {
            LiveSignal::Live(canonical)
        } else {
            LiveSignal::NotLive
        };
    }
    if IS_LIVE.is_match(html) {
        return LiveSignal::Live(canonical);
    }
    match canonical {
        Some(id) => LiveSignal::Live(Some(id)),
        None => LiveSignal::Absent,
    }
}

/// Video id of the newest feed entry, from either a watch or a shorts link.
pub fn latest_video_id(feed: &str) -> Option<String> {
    let entry = &feed[feed.find("<entry")?..];
    let entry = entry.find("</entry>").map_or(entry, |end| &entry[..end]);

    FEED_LINK
        .captures_iter(entry)
        .find_map(|c| VIDEO_LINK.captures(&c[1]).map(|v| v[1].to_string()))
        .or_else(|| FEED_VIDEO_ID.captures(entry).map(|c| c[1].to_string()))
}

/// Thumbnail shown for a live YouTube broadcast.
pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/hqdefault.jpg")
}

/// Live-status lookups against public YouTube pages.
pub struct YoutubeSource {
    feed: ApiClient,
    live: ApiClient,
}

impl YoutubeSource {
    /// Builds the adapter with one client per step so the timeouts stay independent.
    pub fn new(config: &YoutubeConfig) -> Result<Self, HttpError> {
        let feed = ApiClient::new(
            &config.base,
            ClientOptions {
                timeout: Some(config.feed_timeout),
                ..ClientOptions::default()
            },
        )?;
        let live = ApiClient::new(
            &config.base,
            ClientOptions {
                timeout: Some(config.live_timeout),
                user_agent: Some(BROWSER_UA.to_string()),
                ..ClientOptions::default()
            },
        )?;
        Ok(Self { feed, live })
    }

    async fn live_page(&self, channel_id: &str) -> Result<String, HttpError> {
        let url = self.live.url(&["channel", channel_id, "live"], &[])?;
        self.live.get_text(url).await
    }
}

#[async_trait]
impl LiveSource for YoutubeSource {
    fn platform(&self) -> &'static str {
        "youtube"
    }

    async fn lookup(&self, channel_id: &str) -> Result<SourceResult, SourceError> {
        if is_blank(channel_id) {
            return Ok(SourceResult::invalid());
        }
        let channel_id = channel_id.trim();

        let feed_url = self.feed.url(&["feeds", "videos.xml"], &[("channel_id", channel_id)])?;
        let feed = self.feed.get_text(feed_url).await?;
        let Some(latest) = latest_video_id(&feed) else {
            debug!(channel_id, "feed has no recent video, skipping live check");
            return Ok(SourceResult::offline());
        };

        let html = match self.live_page(channel_id).await {
            Ok(html) => html,
            Err(e) => {
                warn!(channel_id, error = %e, "live page check failed, assuming not live");
                return Ok(SourceResult::offline());
            }
        };

        match detect_live(&html) {
            LiveSignal::Live(watch_id) => {
                let video_id = watch_id.unwrap_or(latest);
                debug!(channel_id, video_id = %video_id, "channel is live");
                Ok(SourceResult {
                    valid: true,
                    live: true,
                    icon_url: thumbnail_url(&video_id),
                    video_id: Some(video_id),
                })
            }
            LiveSignal::Upcoming => {
                debug!(channel_id, "broadcast scheduled but not started");
                Ok(SourceResult::offline())
            }
            LiveSignal::NotLive => Ok(SourceResult::offline()),
            LiveSignal::Absent => {
                warn!(channel_id, "no live-signal found on live page");
                Ok(SourceResult::offline())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CHANNEL: &str = "UCabc";

    fn feed_with(link: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns="http://www.w3.org/2005/Atom">
 <link rel="self" href="http://www.youtube.com/feeds/videos.xml?channel_id=UCabc"/>
 <title>Channel</title>
 <entry>
  <id>yt:video:ignored</id>
  <title>Newest</title>
  <link rel="alternate" href="{link}"/>
 </entry>
 <entry>
  <link rel="alternate" href="https://www.youtube.com/watch?v=older"/>
 </entry>
</feed>"#
        )
    }

    fn config_for(server: &MockServer) -> YoutubeConfig {
        YoutubeConfig {
            base: server.uri(),
            feed_timeout: Duration::from_secs(2),
            live_timeout: Duration::from_secs(2),
        }
    }

    async fn mount_feed(server: &MockServer, body: String) {
        Mock::given(method("GET"))
            .and(path("/feeds/videos.xml"))
            .and(query_param("channel_id", CHANNEL))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    async fn mount_live(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!("/channel/{CHANNEL}/live")))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[test]
    fn test_latest_video_id_handles_both_link_shapes() {
        assert_eq!(
            latest_video_id(&feed_with("https://www.youtube.com/watch?v=abc_DEF-1")),
            Some("abc_DEF-1".to_string())
        );
        assert_eq!(
            latest_video_id(&feed_with("https://www.youtube.com/shorts/sh0rt")),
            Some("sh0rt".to_string())
        );
        assert_eq!(latest_video_id("<feed><title>empty</title></feed>"), None);
    }

    #[test]
    fn test_latest_video_id_falls_back_to_video_id_element() {
        let feed = "<feed><entry><yt:videoId>vid123</yt:videoId></entry></feed>";
        assert_eq!(latest_video_id(feed), Some("vid123".to_string()));
    }

    #[test]
    fn test_detect_live_precedence() {
        let canonical = r#"<link rel="canonical" href="https://www.youtube.com/watch?v=LIVE1">"#;
        assert_eq!(
            detect_live(&format!(r#"{canonical}"isLiveNow":true"#)),
            LiveSignal::Live(Some("LIVE1".into()))
        );
        assert_eq!(
            detect_live(&format!(r#"{canonical}"isLiveNow":false"#)),
            LiveSignal::NotLive
        );
        assert_eq!(
            detect_live(&format!(r#"{canonical}"isUpcoming":true,"isLive":true"#)),
            LiveSignal::Upcoming
        );
        assert_eq!(detect_live(canonical), LiveSignal::Live(Some("LIVE1".into())));
        assert_eq!(detect_live(r#""isLive": true"#), LiveSignal::Live(None));
        assert_eq!(detect_live("<html>channel home</html>"), LiveSignal::Absent);
    }

    #[tokio::test]
    async fn test_live_channel_reports_thumbnail_and_video() {
        let server = MockServer::start().await;
        mount_feed(&server, feed_with("https://www.youtube.com/watch?v=vid1")).await;
        mount_live(
            &server,
            ResponseTemplate::new(200).set_body_string(r#"<script>{"isLiveNow":true}</script>"#),
        )
        .await;

        let source = YoutubeSource::new(&config_for(&server)).unwrap();
        assert_eq!(
            source.resolve(CHANNEL).await,
            SourceResult {
                valid: true,
                live: true,
                icon_url: "https://img.youtube.com/vi/vid1/hqdefault.jpg".into(),
                video_id: Some("vid1".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_recent_upload_without_signal_is_not_live() {
        let server = MockServer::start().await;
        mount_feed(&server, feed_with("https://www.youtube.com/watch?v=vid1")).await;
        mount_live(
            &server,
            ResponseTemplate::new(200).set_body_string(r#"<script>{"isLiveNow":false}</script>"#),
        )
        .await;

        let source = YoutubeSource::new(&config_for(&server)).unwrap();
        assert_eq!(
            source.resolve(CHANNEL).await,
            SourceResult {
                valid: true,
                live: false,
                icon_url: String::new(),
                video_id: None,
            }
        );
    }

    #[tokio::test]
    async fn test_live_page_failure_degrades_to_not_live() {
        let server = MockServer::start().await;
        mount_feed(&server, feed_with("https://www.youtube.com/watch?v=vid1")).await;
        mount_live(&server, ResponseTemplate::new(500)).await;

        let source = YoutubeSource::new(&config_for(&server)).unwrap();
        assert_eq!(source.resolve(CHANNEL).await, SourceResult::offline());
    }

    #[tokio::test]
    async fn test_live_page_timeout_degrades_to_not_live() {
        let server = MockServer::start().await;
        mount_feed(&server, feed_with("https://www.youtube.com/watch?v=vid1")).await;
        mount_live(
            &server,
            ResponseTemplate::new(200)
                .set_body_string(r#"{"isLiveNow":true}"#)
                .set_delay(Duration::from_millis(500)),
        )
        .await;

        let config = YoutubeConfig {
            live_timeout: Duration::from_millis(50),
            ..config_for(&server)
        };
        let source = YoutubeSource::new(&config).unwrap();
        assert_eq!(source.resolve(CHANNEL).await, SourceResult::offline());
    }

    #[tokio::test]
    async fn test_feed_failure_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(path("/feeds/videos.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path(format!("/channel/{CHANNEL}/live")))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let source = YoutubeSource::new(&config_for(&server)).unwrap();
        assert!(source.lookup(CHANNEL).await.is_err());
        assert_eq!(source.resolve(CHANNEL).await, SourceResult::invalid());
    }

    #[tokio::test]
    async fn test_blank_channel_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let source = YoutubeSource::new(&config_for(&server)).unwrap();
        assert_eq!(source.resolve(" ").await, SourceResult::invalid());
    }
}

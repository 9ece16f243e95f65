//! # Data Model
//!
//! Cycle-scoped records produced by the adapters and the aggregator, plus the
//! process-lifetime [`RosterEntry`].

use serde::{Deserialize, Serialize};

/// One tracked creator and their per-platform identifiers.
///
/// An empty (or whitespace-only) id means the platform is not tracked for
/// this creator. Field names follow the roster file (`twitch`, `youtube`);
/// `twitchId` / `youtubeId` are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Display name.
    pub name: String,
    /// Twitch login.
    #[serde(default, rename = "twitch", alias = "twitchId")]
    pub twitch_id: String,
    /// YouTube channel id.
    #[serde(default, rename = "youtube", alias = "youtubeId")]
    pub youtube_id: String,
}

impl RosterEntry {
    /// Convenience constructor, mostly for tests and fixtures.
    pub fn new(name: impl Into<String>, twitch_id: impl Into<String>, youtube_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            twitch_id: twitch_id.into(),
            youtube_id: youtube_id.into(),
        }
    }
}

/// Outcome of one adapter lookup.
///
/// When `valid` is false the other fields carry no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceResult {
    /// The lookup completed.
    pub valid: bool,
    /// The creator is broadcasting right now.
    pub live: bool,
    /// Profile image (Twitch) or live thumbnail (YouTube).
    pub icon_url: String,
    /// Live video id, YouTube only.
    pub video_id: Option<String>,
}

impl SourceResult {
    /// The neutral result: lookup not completed, nothing to report.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// A completed lookup that found no live broadcast.
    pub fn offline() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }
}

/// Consolidated status of one creator for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorSnapshot {
    /// Display name from the roster.
    pub name: String,
    /// Twitch login, empty unless the Twitch lookup was valid.
    pub twitch_login: String,
    /// Live on Twitch.
    pub twitch_live: bool,
    /// Twitch profile image.
    pub twitch_icon: String,
    /// Live on YouTube.
    pub youtube_live: bool,
    /// YouTube live thumbnail.
    pub youtube_icon: String,
    /// YouTube live video id.
    pub video_id: Option<String>,
}

impl CreatorSnapshot {
    /// Every derived field reset; only the name survives.
    pub fn neutral(entry: &RosterEntry) -> Self {
        Self {
            name: entry.name.clone(),
            ..Self::default()
        }
    }

    /// Folds both adapter results into one record. An invalid source
    /// contributes nothing, so stale or partial data never leaks through.
    pub fn merge(entry: &RosterEntry, twitch: &SourceResult, youtube: &SourceResult) -> Self {
        let mut snapshot = Self::neutral(entry);
        if twitch.valid {
            snapshot.twitch_login = entry.twitch_id.clone();
            snapshot.twitch_live = twitch.live;
            snapshot.twitch_icon = twitch.icon_url.clone();
        }
        if youtube.valid {
            snapshot.youtube_live = youtube.live;
            snapshot.youtube_icon = youtube.icon_url.clone();
            snapshot.video_id = youtube.video_id.clone();
        }
        snapshot
    }
}

/// One cycle's output, one record per roster entry in roster order.
pub type Snapshot = Vec<CreatorSnapshot>;

/// True when an identifier is missing for the purposes of a lookup.
pub fn is_blank(id: &str) -> bool {
    id.trim().is_empty()
}

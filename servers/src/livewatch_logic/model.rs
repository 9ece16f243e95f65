use serde::Serialize;

use lib_livewatch::core::StatusFrame;
use lib_livewatch::CreatorSnapshot;

/// Event name the browser client listens for.
pub const STATUS_UPDATE: &str = "statusUpdate";

#[derive(Debug, Clone, Serialize)]
pub struct ServerMessage<'a> {
    pub r#type: &'static str,
    pub data: &'a [CreatorSnapshot],
}

impl<'a> ServerMessage<'a> {
    pub fn status_update(frame: &'a StatusFrame) -> Self {
        ServerMessage {
            r#type: STATUS_UPDATE,
            data: &frame.snapshot,
        }
    }

    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_livewatch::RosterEntry;
    use serde_json::json;

    #[test]
    fn test_status_update_wire_shape() {
        let mut live = CreatorSnapshot::neutral(&RosterEntry::new("A", "a_tw", ""));
        live.twitch_login = "a_tw".into();
        live.twitch_live = true;
        live.twitch_icon = "X".into();
        let frame = StatusFrame {
            cycle: 1,
            emitted_at: Default::default(),
            snapshot: vec![live],
        };

        let value: serde_json::Value =
            serde_json::from_str(&ServerMessage::status_update(&frame).to_text().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "statusUpdate",
                "data": [{
                    "name": "A",
                    "twitchLogin": "a_tw",
                    "twitchLive": true,
                    "twitchIcon": "X",
                    "youtubeLive": false,
                    "youtubeIcon": "",
                    "videoId": null
                }]
            })
        );
    }
}

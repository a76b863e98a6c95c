//! Archipelago packet shapes.
//!
//! Every WebSocket text frame carries a JSON array of packets, each tagged by
//! its `cmd` field.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// `ClientStatus` value reported when the goal is reached
pub const CLIENT_GOAL: u32 = 30;

/// Receive items from other worlds, our own world and the starting inventory
pub const ITEMS_HANDLING_ALL: u32 = 0b111;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub class: VersionClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VersionClass {
    #[default]
    Version,
}

pub const PROTOCOL_VERSION: NetworkVersion = NetworkVersion {
    major: 0,
    minor: 5,
    build: 0,
    class: VersionClass::Version,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cmd")]
pub enum ClientPacket {
    Connect {
        password: String,
        game: String,
        name: String,
        uuid: String,
        version: NetworkVersion,
        items_handling: u32,
        tags: Vec<String>,
        slot_data: bool,
    },
    LocationChecks {
        locations: Vec<i64>,
    },
    StatusUpdate {
        status: u32,
    },
    Sync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkItem {
    pub item: i64,
    pub location: i64,
    pub player: i64,
    #[serde(default)]
    pub flags: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct JsonMessagePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd")]
pub enum ServerPacket {
    RoomInfo {
        #[serde(default)]
        seed_name: Option<String>,
        #[serde(default)]
        password: bool,
    },
    Connected {
        team: i64,
        slot: i64,
        #[serde(default)]
        checked_locations: Vec<i64>,
        #[serde(default)]
        missing_locations: Vec<i64>,
    },
    ConnectionRefused {
        #[serde(default)]
        errors: Vec<String>,
    },
    ReceivedItems {
        index: u64,
        items: Vec<NetworkItem>,
    },
    #[serde(rename = "PrintJSON")]
    PrintJson {
        #[serde(default)]
        data: Vec<JsonMessagePart>,
    },
    /// Any packet this client has no use for
    #[serde(other)]
    Unknown,
}

impl ServerPacket {
    /// Plain text of a `PrintJSON` message
    pub fn print_text(data: &[JsonMessagePart]) -> String {
        data.iter().filter_map(|part| part.text.as_deref()).collect()
    }
}

pub fn encode(packets: &[ClientPacket]) -> Result<String> {
    Ok(serde_json::to_string(packets)?)
}

pub fn decode(frame: &str) -> Result<Vec<ServerPacket>> {
    Ok(serde_json::from_str(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn encoded(packet: ClientPacket) -> Value {
        serde_json::from_str(&encode(&[packet]).unwrap()).unwrap()
    }

    #[test]
    fn test_connect_shape() {
        let value = encoded(ClientPacket::Connect {
            password: String::new(),
            game: "Pikmin".to_string(),
            name: "Olimar".to_string(),
            uuid: "abc".to_string(),
            version: PROTOCOL_VERSION,
            items_handling: ITEMS_HANDLING_ALL,
            tags: Vec::new(),
            slot_data: false,
        });
        assert_eq!(
            value,
            json!([{
                "cmd": "Connect",
                "password": "",
                "game": "Pikmin",
                "name": "Olimar",
                "uuid": "abc",
                "version": { "major": 0, "minor": 5, "build": 0, "class": "Version" },
                "items_handling": 7,
                "tags": [],
                "slot_data": false
            }])
        );
    }

    #[test]
    fn test_small_packets_shape() {
        assert_eq!(
            encoded(ClientPacket::LocationChecks {
                locations: vec![5000000, 5000003]
            }),
            json!([{ "cmd": "LocationChecks", "locations": [5000000, 5000003] }])
        );
        assert_eq!(
            encoded(ClientPacket::StatusUpdate {
                status: CLIENT_GOAL
            }),
            json!([{ "cmd": "StatusUpdate", "status": 30 }])
        );
        assert_eq!(encoded(ClientPacket::Sync), json!([{ "cmd": "Sync" }]));
    }

    #[test]
    fn test_decode_mixed_frame() {
        let frame = r#"[
            {"cmd": "RoomInfo", "password": false, "seed_name": "123", "version": {"major": 0, "minor": 5, "build": 1, "class": "Version"}, "tags": []},
            {"cmd": "Connected", "team": 0, "slot": 3, "players": [], "checked_locations": [5000001], "missing_locations": [], "slot_data": {}},
            {"cmd": "ReceivedItems", "index": 0, "items": [{"item": 77000001, "location": 5000002, "player": 2, "flags": 1, "class": "NetworkItem"}]},
            {"cmd": "PrintJSON", "data": [{"text": "Olimar found "}, {"text": "a part", "type": "item_id"}], "type": "ItemSend"},
            {"cmd": "Bounced", "data": {}}
        ]"#;
        let packets = decode(frame).unwrap();
        assert_eq!(packets.len(), 5);
        assert!(matches!(&packets[0], ServerPacket::RoomInfo { password: false, .. }));
        assert!(matches!(
            &packets[1],
            ServerPacket::Connected { slot: 3, checked_locations, .. } if checked_locations == &vec![5000001]
        ));
        assert_eq!(
            packets[2],
            ServerPacket::ReceivedItems {
                index: 0,
                items: vec![NetworkItem {
                    item: 77000001,
                    location: 5000002,
                    player: 2,
                    flags: 1
                }]
            }
        );
        match &packets[3] {
            ServerPacket::PrintJson { data } => {
                assert_eq!(ServerPacket::print_text(data), "Olimar found a part")
            }
            other => panic!("unexpected packet {:?}", other),
        }
        assert_eq!(packets[4], ServerPacket::Unknown);
    }

    #[test]
    fn test_decode_connection_refused() {
        let packets = decode(r#"[{"cmd": "ConnectionRefused", "errors": ["InvalidSlot"]}]"#).unwrap();
        assert_eq!(
            packets,
            vec![ServerPacket::ConnectionRefused {
                errors: vec!["InvalidSlot".to_string()]
            }]
        );
    }

    #[test]
    fn test_decode_garbage_is_error() {
        assert!(decode("not json").is_err());
        assert!(decode(r#"{"cmd": "RoomInfo"}"#).is_err());
    }
}

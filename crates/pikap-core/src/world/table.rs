use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::condition::{CheckId, Condition, check_range, hex_address};
use crate::error::{Error, Result};
use crate::memory::layout::{condition, header};

/// Whether a check is evaluated unconditionally or only while in game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    #[default]
    Always,
    /// Only while the table's `in_game` gate holds
    InGame,
}

/// One watched condition backing a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedCheck {
    pub id: CheckId,
    pub name: String,
    pub condition: Condition,
    #[serde(default)]
    pub evaluation: Evaluation,
}

/// Memory region holding the slot name used to authenticate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRegion {
    #[serde(with = "hex_address")]
    pub address: u32,
    pub length: usize,
}

/// What receiving an item does to game memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemAction {
    /// Add `amount` to the integer at `address`, saturating at `max`
    Increment {
        #[serde(with = "hex_address")]
        address: u32,
        #[serde(default = "default_width")]
        width: u8,
        #[serde(default = "default_amount")]
        amount: u32,
        #[serde(default)]
        max: Option<u32>,
    },
    /// Set one bit of the byte at `address`
    SetBit {
        #[serde(with = "hex_address")]
        address: u32,
        bit: u8,
    },
    /// Nothing to write; the item is only logged
    #[serde(rename = "none")]
    Nothing,
}

fn default_width() -> u8 {
    1
}

fn default_amount() -> u32 {
    1
}

/// An item id and its in-game effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEffect {
    pub id: i64,
    pub name: String,
    pub action: ItemAction,
}

/// World table as written by the generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldFile {
    pub game: String,
    pub game_id: String,
    pub auth: AuthRegion,
    #[serde(default)]
    pub in_game: Option<Condition>,
    #[serde(default)]
    pub goal: Option<Condition>,
    pub checks: Vec<WatchedCheck>,
    #[serde(default)]
    pub items: Vec<ItemEffect>,
}

/// Validated, read-only world table.
#[derive(Debug, Clone)]
pub struct WorldTable {
    file: WorldFile,
    item_index: HashMap<i64, usize>,
}

/// Ship part flags: one byte per part, bit 0 set once collected
const PIKMIN_SHIP_PART_FLAGS: u32 = 0x8042_321C;
const PIKMIN_SHIP_PART_COUNT: u32 = 30;
const PIKMIN_LOCATION_BASE: i64 = 5_000_000;
/// Slot name region written by the patcher into low-memory scratch space
const PIKMIN_AUTH_ADDRESS: u32 = 0x8000_1800;
const PIKMIN_AUTH_LENGTH: usize = 16;

impl WorldTable {
    /// Load and validate a JSON world table
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let table = Self::from_json(&content)?;
        debug!(
            "Loaded world table from {}: {} checks, {} items",
            path.as_ref().display(),
            table.checks().len(),
            table.items().len()
        );
        Ok(table)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: WorldFile = serde_json::from_str(content)?;
        Self::from_file(file)
    }

    /// Validate a parsed file and build lookup indices.
    pub fn from_file(file: WorldFile) -> Result<Self> {
        validate(&file)?;
        let item_index = file
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id, i))
            .collect();
        Ok(Self { file, item_index })
    }

    /// Built-in table for Pikmin (PAL): the 30 ship part flags.
    pub fn builtin() -> Self {
        let checks = (0..PIKMIN_SHIP_PART_COUNT)
            .map(|i| WatchedCheck {
                id: CheckId(PIKMIN_LOCATION_BASE + i as i64),
                name: format!("Ship Part {}", i + 1),
                condition: Condition::Bit {
                    address: PIKMIN_SHIP_PART_FLAGS + i,
                    bit: 0,
                },
                evaluation: Evaluation::Always,
            })
            .collect();

        let file = WorldFile {
            game: "Pikmin".to_string(),
            game_id: "GPIP01".to_string(),
            auth: AuthRegion {
                address: PIKMIN_AUTH_ADDRESS,
                length: PIKMIN_AUTH_LENGTH,
            },
            in_game: None,
            goal: None,
            checks,
            items: Vec::new(),
        };
        let item_index = HashMap::new();
        Self { file, item_index }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.file)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn game(&self) -> &str {
        &self.file.game
    }

    pub fn game_id(&self) -> &str {
        &self.file.game_id
    }

    pub fn auth(&self) -> AuthRegion {
        self.file.auth
    }

    pub fn in_game(&self) -> Option<&Condition> {
        self.file.in_game.as_ref()
    }

    pub fn goal(&self) -> Option<&Condition> {
        self.file.goal.as_ref()
    }

    pub fn checks(&self) -> &[WatchedCheck] {
        &self.file.checks
    }

    pub fn items(&self) -> &[ItemEffect] {
        &self.file.items
    }

    pub fn item(&self, id: i64) -> Option<&ItemEffect> {
        self.item_index.get(&id).map(|&i| &self.file.items[i])
    }

    pub fn check(&self, id: CheckId) -> Option<&WatchedCheck> {
        self.file.checks.iter().find(|c| c.id == id)
    }

    /// Every condition whose memory the detector must snapshot
    pub fn watched_conditions(&self) -> impl Iterator<Item = &Condition> {
        self.file
            .checks
            .iter()
            .map(|c| &c.condition)
            .chain(self.file.in_game.iter())
            .chain(self.file.goal.iter())
    }
}

fn validate(file: &WorldFile) -> Result<()> {
    if file.game.trim().is_empty() {
        return Err(Error::Config("game name is empty".to_string()));
    }

    if file.game_id.len() != header::GAME_ID_LEN
        || !file.game_id.bytes().all(|b| b.is_ascii_alphanumeric())
    {
        return Err(Error::Config(format!(
            "game_id {:?} must be {} ASCII letters or digits",
            file.game_id,
            header::GAME_ID_LEN
        )));
    }

    if file.auth.length == 0 || file.auth.length > condition::MAX_AUTH_LEN {
        return Err(Error::Config(format!(
            "auth length {} must be between 1 and {}",
            file.auth.length,
            condition::MAX_AUTH_LEN
        )));
    }
    check_range("auth", file.auth.address, file.auth.length)?;

    if let Some(gate) = &file.in_game {
        gate.validate("in_game")?;
    }
    if let Some(goal) = &file.goal {
        goal.validate("goal")?;
    }

    if file.checks.is_empty() {
        return Err(Error::Config("check list is empty".to_string()));
    }

    let mut seen = HashSet::new();
    for check in &file.checks {
        if !seen.insert(check.id) {
            return Err(Error::Config(format!("duplicate check id {}", check.id)));
        }
        check
            .condition
            .validate(&format!("check {} ({})", check.id, check.name))?;
    }

    let mut seen_items = HashSet::new();
    for item in &file.items {
        if !seen_items.insert(item.id) {
            return Err(Error::Config(format!("duplicate item id {}", item.id)));
        }
        let context = format!("item {} ({})", item.id, item.name);
        match item.action {
            ItemAction::Increment { address, width, .. } => {
                if !condition::VALID_WIDTHS.contains(&width) {
                    return Err(Error::Config(format!(
                        "{}: width {} must be 1, 2 or 4",
                        context, width
                    )));
                }
                check_range(&context, address, width as usize)?;
            }
            ItemAction::SetBit { address, bit } => {
                if bit > condition::MAX_BIT {
                    return Err(Error::Config(format!(
                        "{}: bit offset {} is out of range 0..=7",
                        context, bit
                    )));
                }
                check_range(&context, address, 1)?;
            }
            ItemAction::Nothing => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "game": "Pikmin",
        "game_id": "GPIP01",
        "auth": { "address": "0x80001800", "length": 16 },
        "in_game": { "type": "bit", "address": "0x80400000", "bit": 7 },
        "goal": { "type": "threshold", "address": "0x80400010", "width": 1, "min": 30 },
        "checks": [
            { "id": 5000000, "name": "Main Engine",
              "condition": { "type": "bit", "address": "0x8042321C", "bit": 0 } },
            { "id": 5000100, "name": "10 Red Pikmin", "evaluation": "in_game",
              "condition": { "type": "threshold", "address": "0x803D6CF7", "min": 10 } }
        ],
        "items": [
            { "id": 77000001, "name": "Red Pikmin Sprout",
              "action": { "type": "increment", "address": "0x803D6CF7", "amount": 5, "max": 100 } },
            { "id": 77000010, "name": "Pellet Posy", "action": { "type": "none" } }
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let table = WorldTable::from_json(SAMPLE).unwrap();
        assert_eq!(table.game(), "Pikmin");
        assert_eq!(table.checks().len(), 2);
        assert_eq!(table.checks()[1].evaluation, Evaluation::InGame);
        assert_eq!(table.checks()[0].evaluation, Evaluation::Always);
        assert_eq!(
            table.auth(),
            AuthRegion {
                address: 0x8000_1800,
                length: 16
            }
        );
        assert!(matches!(
            table.item(77000001).map(|i| &i.action),
            Some(ItemAction::Increment {
                amount: 5,
                max: Some(100),
                width: 1,
                ..
            })
        ));
        assert_eq!(table.item(1), None);
        assert_eq!(table.watched_conditions().count(), 4);
    }

    #[test]
    fn test_builtin_table_is_valid() {
        let table = WorldTable::builtin();
        assert_eq!(table.checks().len(), 30);
        assert_eq!(table.checks()[0].id, CheckId(5_000_000));
        assert_eq!(table.checks()[29].id, CheckId(5_000_029));
        assert_eq!(
            table.checks()[29].condition,
            Condition::Bit {
                address: 0x8042_3239,
                bit: 0
            }
        );
        validate(&table.file).unwrap();
    }

    #[test]
    fn test_rejects_duplicate_check_ids() {
        let mut file = WorldTable::builtin().file;
        let dup = file.checks[0].clone();
        file.checks.push(dup);
        let err = WorldTable::from_file(file).unwrap_err();
        assert!(err.to_string().contains("duplicate check id 5000000"));
    }

    #[test]
    fn test_rejects_bad_game_id() {
        let mut file = WorldTable::builtin().file;
        file.game_id = "GPIP".to_string();
        assert!(matches!(WorldTable::from_file(file), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_bad_auth_length() {
        let mut file = WorldTable::builtin().file;
        file.auth.length = 0;
        assert!(WorldTable::from_file(file.clone()).is_err());
        file.auth.length = 65;
        assert!(WorldTable::from_file(file).is_err());
    }

    #[test]
    fn test_rejects_empty_checks() {
        let mut file = WorldTable::builtin().file;
        file.checks.clear();
        assert!(WorldTable::from_file(file).is_err());
    }

    #[test]
    fn test_rejects_item_outside_mem1() {
        let mut file = WorldTable::builtin().file;
        file.items.push(ItemEffect {
            id: 1,
            name: "Broken".to_string(),
            action: ItemAction::SetBit {
                address: 0x0000_0010,
                bit: 0,
            },
        });
        assert!(WorldTable::from_file(file).is_err());
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(matches!(
            WorldTable::from_json("{ \"game\": "),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_load_and_save_roundtrip_file() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(SAMPLE.as_bytes()).unwrap();
        let table = WorldTable::load(temp.path()).unwrap();

        let out = NamedTempFile::new().unwrap();
        table.save(out.path()).unwrap();
        let reloaded = WorldTable::load(out.path()).unwrap();
        assert_eq!(reloaded.checks(), table.checks());
        assert_eq!(reloaded.items(), table.items());
    }
}

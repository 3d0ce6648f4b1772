//! Character records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Core character fields returned by `/v2/characters/{name}/core`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterCore {
    /// Character name.
    pub name: String,
    /// Race (e.g. "Charr").
    #[serde(default)]
    pub race: String,
    /// Gender.
    #[serde(default)]
    pub gender: String,
    /// Profession (e.g. "Engineer").
    #[serde(default)]
    pub profession: String,
    /// Character level.
    #[serde(default)]
    pub level: u32,
    /// Represented guild id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild: Option<String>,
    /// Seconds played.
    #[serde(default)]
    pub age: u64,
    /// Creation timestamp (ISO 8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Death count.
    #[serde(default)]
    pub deaths: u32,
    /// Selected title id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<u32>,
}

/// One crafting discipline of a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftingDiscipline {
    /// Discipline name (e.g. "Weaponsmith").
    pub discipline: String,
    /// Current rating.
    pub rating: u32,
    /// Whether the discipline is one of the active ones.
    pub active: bool,
}

/// Response of `/v2/characters/{name}/crafting`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterCrafting {
    /// Known disciplines.
    #[serde(default)]
    pub crafting: Vec<CraftingDiscipline>,
}

impl CharacterCrafting {
    /// Returns the active disciplines only.
    pub fn active(&self) -> impl Iterator<Item = &CraftingDiscipline> {
        self.crafting.iter().filter(|d| d.active)
    }
}

/// Full character record returned by `/v2/characters/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Character name.
    pub name: String,
    /// Race.
    #[serde(default)]
    pub race: String,
    /// Gender.
    #[serde(default)]
    pub gender: String,
    /// Profession.
    #[serde(default)]
    pub profession: String,
    /// Character level.
    #[serde(default)]
    pub level: u32,
    /// Represented guild id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild: Option<String>,
    /// Seconds played.
    #[serde(default)]
    pub age: u64,
    /// Creation timestamp (ISO 8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Death count.
    #[serde(default)]
    pub deaths: u32,
    /// Selected title id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<u32>,
    /// Crafting disciplines.
    #[serde(default)]
    pub crafting: Vec<CraftingDiscipline>,
    /// Everything else (equipment, bags, skills...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Character {
    /// Returns the core subset of this record.
    pub fn core(&self) -> CharacterCore {
        CharacterCore {
            name: self.name.clone(),
            race: self.race.clone(),
            gender: self.gender.clone(),
            profession: self.profession.clone(),
            level: self.level,
            guild: self.guild.clone(),
            age: self.age,
            created: self.created.clone(),
            deaths: self.deaths,
            title: self.title,
        }
    }
}

//! Text output formatting with colors.

use std::sync::Arc;
use tyria_core::{Character, CharacterCore, CharacterCrafting, Item, ItemId};

use super::json::{BagOutput, KeyStatusOutput, SlotOutput};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats the occupied slots of a container.
    ///
    /// ```text
    /// Bank (3/250 slots used)
    ///      1   250 × Glob of Ectoplasm
    /// ```
    pub fn format_slots(&self, title: &str, rows: &[SlotOutput], capacity: usize) -> String {
        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(format!(
            "{} {}",
            self.bold(title),
            self.dim(&format!("({}/{capacity} slots used)", rows.len()))
        ));

        if rows.is_empty() {
            lines.push(format!("  {}", self.dim("empty")));
        }

        for row in rows {
            lines.push(self.format_slot(row));
        }

        lines.join("\n")
    }

    fn format_slot(&self, row: &SlotOutput) -> String {
        let mut line = format!(
            "  {:>4}  {:>5} × {}",
            row.slot,
            row.count,
            self.item_label(&row.name, row.id)
        );
        if let Some(binding) = &row.binding {
            line.push_str(&format!(" {}", self.dim(&format!("[{binding}]"))));
        }
        line
    }

    /// Formats a character's equipped bags.
    pub fn format_inventory(&self, character: &str, bags: &[BagOutput]) -> String {
        let mut lines = vec![self.bold(character)];

        if bags.is_empty() {
            lines.push(format!("  {}", self.dim("no bags")));
        }

        for bag in bags {
            lines.push(String::new());
            lines.push(format!(
                "{} {}",
                self.blue(&bag.name),
                self.dim(&format!("(bag {}, {}/{} slots used)", bag.position, bag.used, bag.size))
            ));
            for row in &bag.items {
                lines.push(self.format_slot(row));
            }
        }

        lines.join("\n")
    }

    /// Formats a list of character names.
    pub fn format_characters(&self, names: &[String]) -> String {
        let mut lines = vec![self.bold(&format!("Characters ({})", names.len()))];
        for name in names {
            lines.push(format!("  • {name}"));
        }
        lines.join("\n")
    }

    /// Formats a full character record.
    pub fn format_character(&self, character: &Character) -> String {
        let mut lines = self.core_lines(&character.core());
        if !character.crafting.is_empty() {
            lines.push(String::new());
            lines.extend(self.crafting_lines(&CharacterCrafting {
                crafting: character.crafting.clone(),
            }));
        }
        lines.join("\n")
    }

    /// Formats a character's core fields.
    pub fn format_core(&self, core: &CharacterCore) -> String {
        self.core_lines(core).join("\n")
    }

    /// Formats a character's crafting disciplines.
    pub fn format_crafting(&self, name: &str, crafting: &CharacterCrafting) -> String {
        let mut lines = vec![self.bold(name)];
        lines.extend(self.crafting_lines(crafting));
        lines.join("\n")
    }

    fn core_lines(&self, core: &CharacterCore) -> Vec<String> {
        let mut lines = vec![
            self.bold(&core.name),
            format!(
                "  Level {} {} {} {}",
                core.level, core.gender, core.race, core.profession
            ),
            format!("  Played: {}", format_age(core.age)),
            format!("  Deaths: {}", core.deaths),
        ];
        if let Some(created) = &core.created {
            lines.push(format!("  Created: {created}"));
        }
        if let Some(guild) = &core.guild {
            lines.push(format!("  Guild: {}", self.dim(guild)));
        }
        lines
    }

    fn crafting_lines(&self, crafting: &CharacterCrafting) -> Vec<String> {
        if crafting.crafting.is_empty() {
            return vec![format!("  {}", self.dim("no crafting disciplines"))];
        }

        let mut lines = vec!["  Crafting:".to_string()];
        for discipline in &crafting.crafting {
            let label = format!("{:<14} {:>3}", discipline.discipline, discipline.rating);
            if discipline.active {
                lines.push(format!("    {}", self.green(&label)));
            } else {
                lines.push(format!("    {}", self.dim(&label)));
            }
        }
        lines
    }

    /// Formats catalog records and the ids that had none.
    pub fn format_items(&self, items: &[Arc<Item>], missing: &[ItemId]) -> String {
        let mut lines = Vec::new();

        for item in items {
            let mut line = format!("  {:>6}  {}", item.id, self.rarity_color(item));
            let detail: Vec<&str> = [item.item_type.as_deref(), item.rarity.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            if !detail.is_empty() {
                line.push_str(&format!(" {}", self.dim(&format!("({})", detail.join(", ")))));
            }
            lines.push(line);
        }

        if !missing.is_empty() {
            let ids: Vec<String> = missing.iter().map(ToString::to_string).collect();
            lines.push(self.yellow(&format!("  Not found: {}", ids.join(", "))));
        }

        if lines.is_empty() {
            lines.push(self.dim("No items."));
        }

        lines.join("\n")
    }

    /// Formats the API key status.
    pub fn format_key_status(&self, status: &KeyStatusOutput) -> String {
        let state = match &status.preview {
            Some(preview) if status.set => self.green(&format!("set ({preview})")),
            _ => self.red("not set"),
        };
        [
            format!("{} {state}", self.bold("API key:")),
            format!("  Backend:  {}", status.backend),
            format!("  Encoding: {}", status.encoding),
            format!("  Sent as:  {}", status.auth_strategy),
        ]
        .join("\n")
    }

    fn item_label(&self, name: &str, id: ItemId) -> String {
        format!("{name} {}", self.dim(&format!("({id})")))
    }

    fn rarity_color(&self, item: &Item) -> String {
        match item.rarity.as_deref() {
            Some("Legendary" | "Ascended") => self.magenta(&item.name),
            Some("Exotic") => self.yellow(&item.name),
            Some("Rare") => self.blue(&item.name),
            Some("Masterwork") => self.green(&item.name),
            _ => item.name.clone(),
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn blue(&self, text: &str) -> String {
        self.paint(BLUE, text)
    }

    fn magenta(&self, text: &str) -> String {
        self.paint(MAGENTA, text)
    }
}

/// Formats seconds played as hours and minutes.
pub fn format_age(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

//! Output formatting for CLI.

mod json;
mod text;

pub use json::{BagOutput, ContainerOutput, ItemsOutput, JsonFormatter, KeyStatusOutput, SlotOutput};
pub use text::TextFormatter;

use crate::Cli;

impl Cli {
    /// Text formatter honoring `--no-color`.
    pub fn text_formatter(&self) -> TextFormatter {
        TextFormatter::new(!self.no_color)
    }

    /// JSON formatter honoring `--pretty`.
    pub fn json_formatter(&self) -> JsonFormatter {
        JsonFormatter::new(self.pretty)
    }
}

//! Per-chat response mode.
//!
//! The mode is a display-only preset: it is stored per chat and echoed back
//! by `/mode` and `/status`, but does not change how replies are generated.

use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Standard,
    Professional,
    Casual,
    Creative,
    Technical,
}

impl Mode {
    /// Every selectable mode, in display order.
    pub const ALL: [Mode; 5] = [
        Mode::Standard,
        Mode::Professional,
        Mode::Casual,
        Mode::Creative,
        Mode::Technical,
    ];

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Mode::Standard => "standard",
            Mode::Professional => "professional",
            Mode::Casual => "casual",
            Mode::Creative => "creative",
            Mode::Technical => "technical",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Mode::Standard => "Balanced default style",
            Mode::Professional => "Formal business style",
            Mode::Casual => "Friendly conversational",
            Mode::Creative => "Imaginative responses",
            Mode::Technical => "Detailed explanations",
        }
    }

    /// Name with the first letter upper-cased, for confirmations.
    pub fn title(self) -> String {
        let name = self.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Comma-separated list of all mode names.
    pub fn names() -> String {
        Mode::ALL.iter().map(|m| m.name()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = AppError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Mode::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| AppError::InvalidInput(format!("unknown mode '{}'", s.trim())))
    }
}

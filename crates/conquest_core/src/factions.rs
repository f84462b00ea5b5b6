//! Faction definitions and identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ownership tag carried by every tower and unit.
///
/// Two tags are distinguished: [`FactionTag::Player`] is the human side and
/// [`FactionTag::Neutral`] marks unowned towers. Every other faction is an AI
/// faction; all factions are hostile to every tag other than their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FactionTag {
    /// The human player's faction.
    Player,
    /// Unowned towers. They never pick targets on their own.
    Neutral,
    /// An AI-controlled faction identified by name.
    Ai(String),
}

impl FactionTag {
    /// Convenience constructor for an AI faction.
    #[must_use]
    pub fn ai(name: impl Into<String>) -> Self {
        Self::Ai(name.into())
    }

    /// Whether this is the player's faction.
    #[must_use]
    pub const fn is_player(&self) -> bool {
        matches!(self, Self::Player)
    }

    /// Whether towers of this faction pick and re-roll targets on their own.
    #[must_use]
    pub const fn auto_targets(&self) -> bool {
        matches!(self, Self::Ai(_))
    }

    /// Whether `other` is hostile to this faction.
    #[must_use]
    pub fn is_hostile_to(&self, other: &Self) -> bool {
        self != other
    }
}

impl fmt::Display for FactionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => f.write_str("Player"),
            Self::Neutral => f.write_str("Neutral"),
            Self::Ai(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_ai_factions_auto_target() {
        assert!(!FactionTag::Player.auto_targets());
        assert!(!FactionTag::Neutral.auto_targets());
        assert!(FactionTag::ai("Red").auto_targets());
    }

    #[test]
    fn test_ai_factions_are_mutually_hostile() {
        let red = FactionTag::ai("Red");
        let blue = FactionTag::ai("Blue");
        assert!(red.is_hostile_to(&blue));
        assert!(red.is_hostile_to(&FactionTag::Player));
        assert!(!red.is_hostile_to(&FactionTag::ai("Red")));
    }

    #[test]
    fn test_display_uses_faction_name() {
        assert_eq!(FactionTag::ai("Red").to_string(), "Red");
        assert_eq!(FactionTag::Player.to_string(), "Player");
    }

    #[test]
    fn test_ron_roundtrip_of_level_syntax() {
        let tag: FactionTag = ron::from_str("Ai(\"Green\")").unwrap();
        assert_eq!(tag, FactionTag::ai("Green"));
    }
}

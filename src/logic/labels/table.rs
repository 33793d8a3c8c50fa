//! Label & Command Tables
//!
//! Exact-match lookup from raw label text to `LabelKind`, and from
//! `LabelKind` to the actuation command sent back to the device.
//! Anything not in a table lands on a defined fallback, never on a
//! substring guess.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::LabelKind;

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// ============================================================================
// LABEL TABLE
// ============================================================================

/// Raw label text → label kind. Keys are compared trimmed and
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelTable {
    aliases: BTreeMap<String, LabelKind>,
}

impl LabelTable {
    pub fn new(aliases: BTreeMap<String, LabelKind>) -> Self {
        Self { aliases }
    }

    /// Resolve a raw label; unmapped text is `Unknown`.
    pub fn resolve(&self, raw: &str) -> LabelKind {
        self.lookup(raw).unwrap_or(LabelKind::Unknown)
    }

    /// Resolve a raw label, `None` when unmapped
    pub fn lookup(&self, raw: &str) -> Option<LabelKind> {
        let needle = normalize(raw);
        self.aliases
            .iter()
            .find(|(alias, _)| normalize(alias) == needle)
            .map(|(_, kind)| *kind)
    }

    pub fn insert(&mut self, alias: impl Into<String>, kind: LabelKind) {
        self.aliases.insert(alias.into(), kind);
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl Default for LabelTable {
    /// Labels the field devices are known to send
    fn default() -> Self {
        let entries: &[(&str, LabelKind)] = &[
            ("safe", LabelKind::Safe),
            ("aman", LabelKind::Safe),
            ("hijau", LabelKind::Safe),
            ("green", LabelKind::Safe),
            ("led_hijau", LabelKind::Safe),
            ("caution", LabelKind::Caution),
            ("waspada", LabelKind::Caution),
            ("kuning", LabelKind::Caution),
            ("yellow", LabelKind::Caution),
            ("led_kuning", LabelKind::Caution),
            ("unsafe", LabelKind::Unsafe),
            ("tidak aman", LabelKind::Unsafe),
            ("bahaya", LabelKind::Unsafe),
            ("merah", LabelKind::Unsafe),
            ("red", LabelKind::Unsafe),
            ("led_merah", LabelKind::Unsafe),
        ];
        Self::new(
            entries
                .iter()
                .map(|(alias, kind)| (alias.to_string(), *kind))
                .collect(),
        )
    }
}

// ============================================================================
// COMMAND TABLE
// ============================================================================

/// Label kind → actuation command. Kinds without an entry get `fail_safe`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandTable {
    pub commands: BTreeMap<LabelKind, String>,
    /// Most restrictive command, used for every unmapped kind
    pub fail_safe: String,
}

impl CommandTable {
    pub fn new(commands: BTreeMap<LabelKind, String>, fail_safe: impl Into<String>) -> Self {
        Self {
            commands,
            fail_safe: fail_safe.into(),
        }
    }

    /// Three-way table from explicit tokens, fail-safe = unsafe token
    pub fn three_way(safe: &str, caution: &str, unsafe_: &str) -> Self {
        let mut commands = BTreeMap::new();
        commands.insert(LabelKind::Safe, safe.to_string());
        commands.insert(LabelKind::Caution, caution.to_string());
        commands.insert(LabelKind::Unsafe, unsafe_.to_string());
        Self::new(commands, unsafe_)
    }

    pub fn command_for(&self, kind: LabelKind) -> &str {
        self.commands
            .get(&kind)
            .map(String::as_str)
            .unwrap_or(&self.fail_safe)
    }

    /// Whether `kind` would fall through to the fail-safe command
    pub fn is_fail_safe(&self, kind: LabelKind) -> bool {
        !self.commands.contains_key(&kind)
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::three_way("LED_HIJAU", "LED_KUNING", "LED_MERAH")
    }
}

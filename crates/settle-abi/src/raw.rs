//! Raw interface description as supplied by the contract deployer.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Contract name to its interface entries, in declaration order.
pub type RawInterface = BTreeMap<String, Vec<RawAbiEntry>>;

/// Kind of a raw interface entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawEntryType {
    Function,
    Event,
    /// Constructors, fallbacks and anything else the map does not index.
    #[serde(other)]
    Other,
}

/// One function or event entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAbiEntry {
    #[serde(rename = "type")]
    pub entry_type: RawEntryType,
    /// Either a bare name (`balanceOf`) or a full signature (`balanceOf(address)`).
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<RawParam>,
    #[serde(default)]
    pub outputs: Vec<RawParam>,
    #[serde(default)]
    pub constant: bool,
    /// Newer ABIs encode mutability here instead of `constant`.
    #[serde(rename = "stateMutability", default)]
    pub state_mutability: Option<String>,
}

impl RawAbiEntry {
    /// Whether the function does not mutate ledger state.
    pub fn is_constant(&self) -> bool {
        self.constant
            || matches!(
                self.state_mutability.as_deref(),
                Some("view") | Some("pure")
            )
    }
}

/// Input or output parameter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub indexed: bool,
}

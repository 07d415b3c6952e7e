//! Typed function and event registries.
//!
//! Built once from a [`RawInterface`] and read-only afterwards. Every
//! function and event in the description lands in the map exactly once;
//! anything that cannot be keyed or parsed fails the build.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use alloy::primitives::{keccak256, B256};
use tracing::debug;

use crate::error::{AbiError, AbiResult};
use crate::raw::{RawAbiEntry, RawEntryType, RawInterface, RawParam};

/// Parameter names with this prefix carry fixed-point amounts.
const FIXED_POINT_PREFIX: &str = "fxp";

/// How a function's return value should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    /// No outputs.
    None,
    /// Fixed-point encoded number.
    Fixed,
    /// Plain integer or boolean.
    Numeric,
    /// Addresses, byte strings, strings.
    Text,
}

impl ReturnKind {
    fn classify(outputs: &[RawParam]) -> Self {
        let Some(first) = outputs.first() else {
            return ReturnKind::None;
        };
        if first.name.starts_with(FIXED_POINT_PREFIX) {
            return ReturnKind::Fixed;
        }
        let ty = first.param_type.as_str();
        if ty.starts_with("int") || ty.starts_with("uint") || ty == "bool" {
            ReturnKind::Numeric
        } else {
            ReturnKind::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnKind::None => "null",
            ReturnKind::Fixed => "unfix",
            ReturnKind::Numeric => "number",
            ReturnKind::Text => "string",
        }
    }
}

/// Callable contract function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiFunctionDescriptor {
    pub contract: String,
    /// Method name, the key under which the function is stored.
    pub method: String,
    /// Canonical `method(type,...)` string.
    pub signature_name: String,
    /// Human-readable title (`balanceOf` -> `Balance Of`).
    pub label: String,
    pub constant: bool,
    pub input_names: Vec<String>,
    pub input_types: Vec<String>,
    pub returns: ReturnKind,
    /// Declared type of the first output, if any.
    pub return_type: Option<String>,
    /// Positions of fixed-point encoded inputs; `None` when there are none.
    pub fixed: Option<Vec<usize>>,
}

impl AbiFunctionDescriptor {
    #[inline]
    pub fn arity(&self) -> usize {
        self.input_types.len()
    }

    /// Whether the input at `index` carries a fixed-point amount.
    pub fn is_fixed_input(&self, index: usize) -> bool {
        self.fixed
            .as_ref()
            .is_some_and(|positions| positions.contains(&index))
    }
}

/// Event input with its indexing flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiEventInput {
    pub name: String,
    pub param_type: String,
    pub indexed: bool,
}

/// Log event a contract may emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiEventDescriptor {
    pub contract: String,
    pub name: String,
    /// Canonical `Name(type,...)` string the topic is derived from.
    pub canonical: String,
    pub inputs: Vec<AbiEventInput>,
    /// keccak256 of `canonical`; the leading topic of matching logs.
    pub topic: B256,
}

impl AbiEventDescriptor {
    /// Inputs carried in the log payload rather than in topics.
    pub fn data_inputs(&self) -> impl Iterator<Item = &AbiEventInput> {
        self.inputs.iter().filter(|input| !input.indexed)
    }
}

/// Function registry per contract plus a flat event registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbiMap {
    functions: BTreeMap<String, BTreeMap<String, AbiFunctionDescriptor>>,
    events: BTreeMap<String, AbiEventDescriptor>,
}

impl AbiMap {
    /// Build the map from a raw description.
    pub fn build(raw: &RawInterface) -> AbiResult<Self> {
        let mut map = AbiMap::default();

        for (contract, entries) in raw {
            let functions = map.functions.entry(contract.clone()).or_default();

            for (index, entry) in entries.iter().enumerate() {
                match entry.entry_type {
                    RawEntryType::Function => {
                        let descriptor = build_function(contract, index, entry)?;
                        match functions.entry(descriptor.method.clone()) {
                            Entry::Occupied(_) => {
                                return Err(AbiError::DuplicateFunction {
                                    contract: contract.clone(),
                                    key: descriptor.method,
                                });
                            }
                            Entry::Vacant(slot) => {
                                slot.insert(descriptor);
                            }
                        }
                    }
                    RawEntryType::Event => {
                        let descriptor = build_event(contract, index, entry)?;
                        match map.events.entry(descriptor.name.clone()) {
                            Entry::Occupied(existing) => {
                                return Err(AbiError::DuplicateEvent {
                                    name: descriptor.name,
                                    first: existing.get().contract.clone(),
                                    second: contract.clone(),
                                });
                            }
                            Entry::Vacant(slot) => {
                                slot.insert(descriptor);
                            }
                        }
                    }
                    RawEntryType::Other => {}
                }
            }
        }

        debug!(
            contracts = map.functions.len(),
            events = map.events.len(),
            "ABI map built"
        );

        Ok(map)
    }

    /// Parse a JSON description and build the map.
    pub fn from_json(json: &str) -> AbiResult<Self> {
        let raw: RawInterface = serde_json::from_str(json)?;
        Self::build(&raw)
    }

    pub fn function(&self, contract: &str, method: &str) -> AbiResult<&AbiFunctionDescriptor> {
        self.functions
            .get(contract)
            .and_then(|functions| functions.get(method))
            .ok_or_else(|| AbiError::FunctionNotFound {
                contract: contract.to_string(),
                key: method.to_string(),
            })
    }

    pub fn event(&self, name: &str) -> AbiResult<&AbiEventDescriptor> {
        self.events
            .get(name)
            .ok_or_else(|| AbiError::EventNotFound(name.to_string()))
    }

    pub fn functions(&self) -> &BTreeMap<String, BTreeMap<String, AbiFunctionDescriptor>> {
        &self.functions
    }

    pub fn events(&self) -> &BTreeMap<String, AbiEventDescriptor> {
        &self.events
    }
}

/// Split `name(type,...)` into the base name and its declared types.
fn split_signature(contract: &str, name: &str) -> AbiResult<(String, Option<Vec<String>>)> {
    let malformed = |reason: &str| AbiError::MalformedSignature {
        contract: contract.to_string(),
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let (base, declared) = match name.find('(') {
        None => (name, None),
        Some(open) => {
            let rest = &name[open + 1..];
            let inner = rest
                .strip_suffix(')')
                .ok_or_else(|| malformed("missing closing parenthesis"))?;
            if inner.contains('(') || inner.contains(')') {
                return Err(malformed("nested parentheses"));
            }
            let types = if inner.trim().is_empty() {
                Vec::new()
            } else {
                inner.split(',').map(|t| t.trim().to_string()).collect()
            };
            (&name[..open], Some(types))
        }
    };

    let base = base.trim();
    if base.is_empty() {
        return Err(malformed("empty name"));
    }
    if !base.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(malformed("name is not an identifier"));
    }

    Ok((base.to_string(), declared))
}

fn entry_name<'a>(contract: &str, index: usize, entry: &'a RawAbiEntry) -> AbiResult<&'a str> {
    entry
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AbiError::MissingName {
            contract: contract.to_string(),
            index,
        })
}

/// Input types in order, checked against a declared type list if present.
fn input_types(
    contract: &str,
    name: &str,
    inputs: &[RawParam],
    declared: Option<Vec<String>>,
) -> AbiResult<Vec<String>> {
    let derived: Vec<String> = inputs.iter().map(|p| p.param_type.trim().to_string()).collect();

    if derived.iter().any(|t| t.is_empty()) {
        return Err(AbiError::MalformedSignature {
            contract: contract.to_string(),
            name: name.to_string(),
            reason: "input with empty type".to_string(),
        });
    }

    if let Some(declared) = declared {
        if declared != derived {
            return Err(AbiError::SignatureMismatch {
                contract: contract.to_string(),
                name: name.to_string(),
                declared: declared.join(","),
                derived: derived.join(","),
            });
        }
    }

    Ok(derived)
}

/// Title-case a camelCase or snake_case identifier.
fn make_label(method: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for c in method.chars() {
        if c == '_' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if c.is_ascii_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.push(c);
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_function(
    contract: &str,
    index: usize,
    entry: &RawAbiEntry,
) -> AbiResult<AbiFunctionDescriptor> {
    let name = entry_name(contract, index, entry)?;
    let (method, declared) = split_signature(contract, name)?;
    let input_types = input_types(contract, name, &entry.inputs, declared)?;

    let fixed: Vec<usize> = entry
        .inputs
        .iter()
        .enumerate()
        .filter(|(_, p)| p.name.starts_with(FIXED_POINT_PREFIX))
        .map(|(i, _)| i)
        .collect();

    Ok(AbiFunctionDescriptor {
        contract: contract.to_string(),
        signature_name: format!("{}({})", method, input_types.join(",")),
        label: make_label(&method),
        method,
        constant: entry.is_constant(),
        input_names: entry.inputs.iter().map(|p| p.name.clone()).collect(),
        input_types,
        returns: ReturnKind::classify(&entry.outputs),
        return_type: entry.outputs.first().map(|p| p.param_type.clone()),
        fixed: if fixed.is_empty() { None } else { Some(fixed) },
    })
}

fn build_event(contract: &str, index: usize, entry: &RawAbiEntry) -> AbiResult<AbiEventDescriptor> {
    let name = entry_name(contract, index, entry)?;
    let (base, declared) = split_signature(contract, name)?;
    let types = input_types(contract, name, &entry.inputs, declared)?;
    let canonical = format!("{}({})", base, types.join(","));

    Ok(AbiEventDescriptor {
        contract: contract.to_string(),
        topic: keccak256(canonical.as_bytes()),
        canonical,
        name: base,
        inputs: entry
            .inputs
            .iter()
            .map(|p| AbiEventInput {
                name: p.name.clone(),
                param_type: p.param_type.clone(),
                indexed: p.indexed,
            })
            .collect(),
    })
}

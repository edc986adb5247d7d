use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

use super::params::{CONSTANT_NAMES, ConfigurableConstants, constant_width};

/// Where each configurable constant lives inside the predicate bytecode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurableLayout {
    offsets: BTreeMap<String, usize>,
}

#[derive(Deserialize)]
struct AbiDocument {
    #[serde(default)]
    configurables: Vec<AbiConfigurable>,
}

#[derive(Deserialize)]
struct AbiConfigurable {
    name: String,
    offset: usize,
}

impl ConfigurableLayout {
    pub fn new<'a>(slots: impl IntoIterator<Item = (&'a str, usize)>) -> Result<Self> {
        let mut offsets = BTreeMap::new();
        for (name, offset) in slots {
            if offsets.insert(name.to_string(), offset).is_some() {
                return Err(Error::InvalidTemplate(format!(
                    "configurable {name} declared twice"
                )));
            }
        }
        Ok(Self { offsets })
    }

    /// Read the `configurables` section of a predicate ABI document.
    ///
    /// ```text
    /// { "configurables": [ { "name": "ASK_AMOUNT", "offset": 1184, ... }, ... ] }
    /// ```
    ///
    /// Other ABI fields are ignored.
    pub fn from_abi_json(json: &str) -> Result<Self> {
        let doc: AbiDocument = serde_json::from_str(json)
            .map_err(|e| Error::InvalidTemplate(format!("ABI parse error: {e}")))?;
        Self::new(
            doc.configurables
                .iter()
                .map(|c| (c.name.as_str(), c.offset)),
        )
    }

    pub fn offset(&self, name: &str) -> Option<usize> {
        self.offsets.get(name).copied()
    }
}

/// A versioned predicate template: bytecode with placeholder configurables.
///
/// The template is treated as opaque; only its declared layout is inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateTemplate {
    version: u8,
    bytecode: Vec<u8>,
    layout: ConfigurableLayout,
}

impl PredicateTemplate {
    /// Validate and wrap a template.
    ///
    /// Every swap constant must have a slot, each slot must fit inside the
    /// bytecode, and slots must not overlap.
    pub fn new(version: u8, bytecode: Vec<u8>, layout: ConfigurableLayout) -> Result<Self> {
        let mut slots = Vec::with_capacity(CONSTANT_NAMES.len());
        for name in CONSTANT_NAMES {
            let offset = layout.offset(name).ok_or_else(|| {
                Error::InvalidTemplate(format!("layout has no slot for {name}"))
            })?;
            let width = constant_width(name).unwrap_or_default();
            let end = offset
                .checked_add(width)
                .ok_or_else(|| Error::InvalidTemplate(format!("slot {name} overflows")))?;
            if end > bytecode.len() {
                return Err(Error::InvalidTemplate(format!(
                    "slot {name} ({offset}..{end}) exceeds bytecode length {}",
                    bytecode.len()
                )));
            }
            slots.push((offset, end, name));
        }

        slots.sort_unstable();
        for pair in slots.windows(2) {
            let (_, prev_end, prev) = pair[0];
            let (start, _, name) = pair[1];
            if start < prev_end {
                return Err(Error::InvalidTemplate(format!(
                    "slots {prev} and {name} overlap"
                )));
            }
        }

        Ok(Self {
            version,
            bytecode,
            layout,
        })
    }

    /// Load a template from a compiled predicate binary and its ABI JSON.
    pub fn from_files(version: u8, bytecode_path: &Path, abi_path: &Path) -> Result<Self> {
        let bytecode = std::fs::read(bytecode_path).map_err(|e| {
            Error::InvalidTemplate(format!("read {}: {e}", bytecode_path.display()))
        })?;
        let abi = std::fs::read_to_string(abi_path)
            .map_err(|e| Error::InvalidTemplate(format!("read {}: {e}", abi_path.display())))?;
        Self::new(version, bytecode, ConfigurableLayout::from_abi_json(&abi)?)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    pub fn layout(&self) -> &ConfigurableLayout {
        &self.layout
    }

    /// Copy the bytecode with every constant written at its slot.
    pub fn instantiate(&self, constants: &ConfigurableConstants) -> Vec<u8> {
        let mut code = self.bytecode.clone();
        for (name, value) in constants.build_arguments() {
            // Slots were validated in `new`.
            if let Some(offset) = self.layout.offset(name) {
                let encoded = value.encode();
                code[offset..offset + encoded.len()].copy_from_slice(&encoded);
            }
        }
        code
    }
}

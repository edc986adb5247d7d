use serde::{Deserialize, Serialize};

use crate::types::Address;

use super::params::ConfigurableConstants;
use super::root::predicate_address;
use super::template::PredicateTemplate;

/// Compute the escrow (predicate) address for a template and its constants.
///
/// Pure: identical inputs always give the identical address, and any change
/// to the template bytes, version or a constant changes it.
pub fn derive_escrow_address(
    template: &PredicateTemplate,
    constants: &ConfigurableConstants,
) -> Address {
    let code = template.instantiate(constants);
    predicate_address(template.version(), &code)
}

/// A swap predicate instantiated with its constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowAccount {
    address: Address,
    constants: ConfigurableConstants,
}

impl EscrowAccount {
    pub fn derive(template: &PredicateTemplate, constants: ConfigurableConstants) -> Self {
        Self {
            address: derive_escrow_address(template, &constants),
            constants,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn constants(&self) -> &ConfigurableConstants {
        &self.constants
    }
}

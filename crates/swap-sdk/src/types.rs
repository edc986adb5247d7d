use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length in bytes of every chain identifier (addresses, asset IDs, resource IDs).
pub const ID_LEN: usize = 32;

/// Why a string could not be read as a 32-byte identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("identifier is empty")]
    Empty,

    #[error("expected {expected} hex characters, found {found}")]
    WrongLength { expected: usize, found: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Parse a 32-byte identifier from hex, with or without a `0x` prefix.
///
/// Surrounding whitespace is ignored. No structural validation is done
/// beyond length and charset.
pub fn parse_id(input: &str) -> Result<[u8; ID_LEN], IdParseError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(IdParseError::Empty);
    }
    if digits.len() != ID_LEN * 2 {
        return Err(IdParseError::WrongLength {
            expected: ID_LEN * 2,
            found: digits.len(),
        });
    }
    let bytes = hex::decode(digits).map_err(|e| IdParseError::InvalidHex(e.to_string()))?;
    let mut out = [0u8; ID_LEN];
    out.copy_from_slice(&bytes);
    Ok(out)
}

macro_rules! chain_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; ID_LEN]);

        impl $name {
            pub const fn new(bytes: [u8; ID_LEN]) -> Self {
                Self(bytes)
            }

            pub const fn to_bytes(self) -> [u8; ID_LEN] {
                self.0
            }

            pub fn as_bytes(&self) -> &[u8; ID_LEN] {
                &self.0
            }
        }

        impl From<[u8; ID_LEN]> for $name {
            fn from(bytes: [u8; ID_LEN]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_id(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

chain_id!(
    /// Owner of a resource: a wallet address or a predicate root.
    Address
);
chain_id!(
    /// Asset identifier.
    AssetId
);
chain_id!(
    /// Opaque identifier of a spendable resource.
    ResourceId
);
chain_id!(
    /// Identifier of a submitted transaction.
    TxId
);
chain_id!(
    /// Key under which a node deduplicates resubmissions of one draft.
    IdempotencyKey
);

/// A discrete, indivisible unit of on-chain value owned by one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpendableResource {
    pub resource_id: ResourceId,
    pub owner: Address,
    pub asset_id: AssetId,
    pub amount: u64,
}

/// How an output's amount was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Fixed amount required by the swap.
    Coin,
    /// Surplus of an asset returned to its payer.
    Change,
}

/// A transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Output {
    pub kind: OutputKind,
    pub to: Address,
    pub amount: u64,
    pub asset_id: AssetId,
}

impl Output {
    pub fn coin(to: Address, amount: u64, asset_id: AssetId) -> Self {
        Self {
            kind: OutputKind::Coin,
            to,
            amount,
            asset_id,
        }
    }

    pub fn change(to: Address, amount: u64, asset_id: AssetId) -> Self {
        Self {
            kind: OutputKind::Change,
            to,
            amount,
            asset_id,
        }
    }

    pub fn is_change(&self) -> bool {
        self.kind == OutputKind::Change
    }
}

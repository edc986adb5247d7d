use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Address, AssetId, ID_LEN, parse_id};

pub const FEE_AMOUNT: &str = "FEE_AMOUNT";
pub const FEE_ASSET: &str = "FEE_ASSET";
pub const TREASURY_ADDRESS: &str = "TREASURY_ADDRESS";
pub const ASK_AMOUNT: &str = "ASK_AMOUNT";
pub const ASK_ASSET: &str = "ASK_ASSET";
pub const RECEIVER: &str = "RECEIVER";
pub const LOCKED_ASSET_ID: &str = "LOCKED_ASSET_ID";

/// Older form key for [`LOCKED_ASSET_ID`], still accepted by the binder.
pub const LEGACY_LOCKED_ASSET_KEY: &str = "NFT_ASSET_ID";

/// Every configurable constant the swap predicate declares.
pub const CONSTANT_NAMES: [&str; 7] = [
    FEE_AMOUNT,
    FEE_ASSET,
    TREASURY_ADDRESS,
    ASK_AMOUNT,
    ASK_ASSET,
    RECEIVER,
    LOCKED_ASSET_ID,
];

/// A typed configurable value, as encoded into predicate bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantValue {
    /// 8 bytes, big-endian.
    U64(u64),
    /// 32 raw bytes.
    Id([u8; ID_LEN]),
}

impl ConstantValue {
    /// Encoded width in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            ConstantValue::U64(_) => 8,
            ConstantValue::Id(_) => ID_LEN,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            ConstantValue::U64(v) => v.to_be_bytes().to_vec(),
            ConstantValue::Id(bytes) => bytes.to_vec(),
        }
    }
}

/// Compile-time parameters of a fixed-price swap predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigurableConstants {
    /// Treasury cut, carved out of the ask.
    pub fee_amount: u64,
    /// Asset the treasury cut is paid in.
    pub fee_asset: AssetId,
    pub treasury_address: Address,
    /// Total price of the locked unit.
    pub ask_amount: u64,
    pub ask_asset: AssetId,
    /// Seller: receives the price and may reclaim the deposit.
    pub receiver: Address,
    /// Asset held by the escrow (one unit).
    pub locked_asset_id: AssetId,
}

impl ConfigurableConstants {
    /// Bind the seven named raw inputs into typed constants.
    ///
    /// Fails with [`Error::MalformedConstant`] naming the first key (in
    /// declaration order) that is missing, empty or unparseable.
    pub fn bind(form: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            fee_amount: parse_amount(FEE_AMOUNT, lookup(form, FEE_AMOUNT)?)?,
            fee_asset: parse_identifier(FEE_ASSET, lookup(form, FEE_ASSET)?)?.into(),
            treasury_address: parse_identifier(TREASURY_ADDRESS, lookup(form, TREASURY_ADDRESS)?)?
                .into(),
            ask_amount: parse_amount(ASK_AMOUNT, lookup(form, ASK_AMOUNT)?)?,
            ask_asset: parse_identifier(ASK_ASSET, lookup(form, ASK_ASSET)?)?.into(),
            receiver: parse_identifier(RECEIVER, lookup(form, RECEIVER)?)?.into(),
            locked_asset_id: parse_identifier(LOCKED_ASSET_ID, lookup(form, LOCKED_ASSET_ID)?)?
                .into(),
        })
    }

    /// The inverse of [`bind`](Self::bind): canonical string form of every constant.
    pub fn to_form(&self) -> HashMap<String, String> {
        self.build_arguments()
            .into_iter()
            .map(|(name, value)| {
                let raw = match value {
                    ConstantValue::U64(v) => v.to_string(),
                    ConstantValue::Id(bytes) => format!("0x{}", hex::encode(bytes)),
                };
                (name.to_string(), raw)
            })
            .collect()
    }

    /// Amount the receiver gets: `ask_amount - fee_amount`.
    pub fn receiver_amount(&self) -> Result<u64> {
        self.ask_amount
            .checked_sub(self.fee_amount)
            .ok_or(Error::ZeroOrNegativeFee {
                fee_amount: self.fee_amount,
                ask_amount: self.ask_amount,
            })
    }

    /// Whether the treasury cut is paid in the ask asset.
    pub fn fee_in_ask_asset(&self) -> bool {
        self.fee_asset == self.ask_asset
    }

    /// What the payer must put into the swap, merged per asset.
    ///
    /// Same assets: `[(ask_asset, ask_amount)]`. Different assets:
    /// `[(ask_asset, ask_amount - fee_amount), (fee_asset, fee_amount)]`,
    /// with zero entries dropped.
    pub fn payer_requirements(&self) -> Result<Vec<(AssetId, u64)>> {
        let receiver_amount = self.receiver_amount()?;
        if self.fee_in_ask_asset() {
            return Ok(vec![(self.ask_asset, self.ask_amount)]);
        }
        Ok([
            (self.ask_asset, receiver_amount),
            (self.fee_asset, self.fee_amount),
        ]
        .into_iter()
        .filter(|(_, amount)| *amount > 0)
        .collect())
    }

    /// Typed values keyed by constant name, for predicate instantiation.
    pub fn build_arguments(&self) -> HashMap<&'static str, ConstantValue> {
        HashMap::from([
            (FEE_AMOUNT, ConstantValue::U64(self.fee_amount)),
            (FEE_ASSET, ConstantValue::Id(self.fee_asset.to_bytes())),
            (
                TREASURY_ADDRESS,
                ConstantValue::Id(self.treasury_address.to_bytes()),
            ),
            (ASK_AMOUNT, ConstantValue::U64(self.ask_amount)),
            (ASK_ASSET, ConstantValue::Id(self.ask_asset.to_bytes())),
            (RECEIVER, ConstantValue::Id(self.receiver.to_bytes())),
            (
                LOCKED_ASSET_ID,
                ConstantValue::Id(self.locked_asset_id.to_bytes()),
            ),
        ])
    }
}

/// The declared width of each constant, used to validate template layouts.
pub fn constant_width(name: &str) -> Option<usize> {
    match name {
        FEE_AMOUNT | ASK_AMOUNT => Some(8),
        FEE_ASSET | TREASURY_ADDRESS | ASK_ASSET | RECEIVER | LOCKED_ASSET_ID => Some(ID_LEN),
        _ => None,
    }
}

fn lookup<'a>(form: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    let value = form.get(key).or_else(|| {
        if key == LOCKED_ASSET_ID {
            form.get(LEGACY_LOCKED_ASSET_KEY)
        } else {
            None
        }
    });
    value.map(String::as_str).ok_or_else(|| malformed(key, "missing"))
}

fn parse_amount(key: &str, raw: &str) -> Result<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(malformed(key, "empty"));
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(key, "not an unsigned decimal integer"));
    }
    trimmed
        .parse::<u64>()
        .map_err(|_| malformed(key, "out of range for u64"))
}

fn parse_identifier(key: &str, raw: &str) -> Result<[u8; ID_LEN]> {
    parse_id(raw).map_err(|e| malformed(key, &e.to_string()))
}

fn malformed(key: &str, reason: &str) -> Error {
    Error::MalformedConstant {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

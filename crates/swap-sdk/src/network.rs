use serde::{Deserialize, Serialize};

use crate::types::AssetId;

/// Base asset of the public networks.
const PUBLIC_BASE_ASSET: [u8; 32] = [
    0xf8, 0xf8, 0xb6, 0x28, 0x3d, 0x7f, 0xa5, 0xb6, 0x72, 0xb5, 0x30, 0xcb, 0xb8, 0x4f, 0xcc, 0xcb,
    0x4f, 0xf8, 0xdc, 0x40, 0xf8, 0x17, 0x6e, 0xf4, 0x54, 0x4d, 0xdb, 0x1f, 0x19, 0x52, 0xad, 0x07,
];

/// Networks the swap desk can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Local,
}

impl Network {
    pub fn is_mainnet(self) -> bool {
        matches!(self, Network::Mainnet)
    }

    /// Asset the network fee is paid in.
    pub fn base_asset(self) -> AssetId {
        match self {
            Network::Mainnet | Network::Testnet => AssetId::new(PUBLIC_BASE_ASSET),
            Network::Local => AssetId::default(),
        }
    }

    pub fn default_node_url(self) -> &'static str {
        match self {
            Network::Mainnet => "https://mainnet.fuel.network/v1/graphql",
            Network::Testnet => "https://testnet.fuel.network/v1/graphql",
            Network::Local => "http://127.0.0.1:4000/v1/graphql",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Local => "local",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "local" | "localhost" | "devnet" => Ok(Network::Local),
            _ => Err(format!("invalid network: {}", s)),
        }
    }
}

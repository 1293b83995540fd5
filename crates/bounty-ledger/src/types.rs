use crate::address_encoding;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TOKEN_DECIMALS: u32 = 9;
pub const TOKEN_BASE_UNIT: u64 = 1_000_000_000; // 10^9

/// Flat fee charged to the funder when an escrow is created.
pub const BOUNTY_CREATION_FEE: TokenAmount = TokenAmount::from_base_units(1_000_000);

/// Platform cut taken from the prize at settlement: 100 bps = 1%.
pub const PLATFORM_FEE_BPS: u16 = 100;
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Cap on description and submission hash strings (IPFS CID or digest).
pub const MAX_HASH_LEN: usize = 64;

/// Unclaimed escrows become reclaimable after 180 days.
pub const ESCROW_EXPIRY_SECONDS: i64 = 15_552_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenAmount(u64);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    pub fn from_tokens(tokens: f64) -> Self {
        Self((tokens * TOKEN_BASE_UNIT as f64) as u64)
    }

    pub const fn from_base_units(units: u64) -> Self {
        Self(units)
    }

    pub fn to_tokens(&self) -> f64 {
        self.0 as f64 / TOKEN_BASE_UNIT as f64
    }

    pub fn to_base_units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9} BNTY", self.to_tokens())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_bech32(&self) -> Result<String> {
        address_encoding::encode_address(&self.0)
    }

    pub fn from_bech32(address: &str) -> Result<Self> {
        let bytes = address_encoding::decode_address(address)?;
        Ok(Self(bytes))
    }

    pub fn from_string(address: &str) -> Result<Self> {
        if address.starts_with("bnty") {
            Self::from_bech32(address)
        } else if address_encoding::is_hex_address(address) {
            let bytes = address_encoding::from_hex_address(address)?;
            Ok(Self(bytes))
        } else {
            Err(anyhow::anyhow!("Invalid address format"))
        }
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_bech32() {
            Ok(addr) => write!(f, "{}", addr),
            Err(_) => write!(f, "0x{}", hex::encode(&self.0[..8])),
        }
    }
}

/// Why a fund movement happened, attached to every recorded transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferReason {
    CreationFee,
    EscrowDeposit,
    WinnerPayout,
    PlatformFee,
    ExpiredReclaim,
}

impl fmt::Display for TransferReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransferReason::CreationFee => "creation_fee",
            TransferReason::EscrowDeposit => "escrow_deposit",
            TransferReason::WinnerPayout => "winner_payout",
            TransferReason::PlatformFee => "platform_fee",
            TransferReason::ExpiredReclaim => "expired_reclaim",
        };
        write!(f, "{}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_arithmetic() {
        let a = TokenAmount::from_base_units(100);
        let b = TokenAmount::from_base_units(30);

        assert_eq!(a.checked_add(b), Some(TokenAmount::from_base_units(130)));
        assert_eq!(a.checked_sub(b), Some(TokenAmount::from_base_units(70)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(b.saturating_sub(a), TokenAmount::ZERO);
    }

    #[test]
    fn test_amount_overflow() {
        let max = TokenAmount::from_base_units(u64::MAX);
        assert_eq!(max.checked_add(TokenAmount::from_base_units(1)), None);
        assert_eq!(max.saturating_add(TokenAmount::from_base_units(1)), max);
    }

    #[test]
    fn test_token_conversion() {
        let amount = TokenAmount::from_tokens(5.0);
        assert_eq!(amount.to_base_units(), 5 * TOKEN_BASE_UNIT);
        assert_eq!(TokenAmount::ZERO.to_tokens(), 0.0);
    }

    #[test]
    fn test_address_string_round_trip() {
        let addr = AccountAddress::from_bytes([0x42; 32]);

        let bech = addr.to_bech32().unwrap();
        assert!(bech.starts_with("bnty1"));
        assert_eq!(AccountAddress::from_string(&bech).unwrap(), addr);

        let hex_form = format!("0x{}", hex::encode(addr.as_bytes()));
        assert_eq!(AccountAddress::from_string(&hex_form).unwrap(), addr);

        assert!(AccountAddress::from_string("not-an-address").is_err());
    }
}

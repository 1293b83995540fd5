use crate::error::{LedgerError, Result};
use crate::types::{AccountAddress, TokenAmount};
use serde::{Deserialize, Serialize};

/// Platform-wide aggregate record. A single instance lives at the derived
/// treasury address; every counter is monotonically non-decreasing and only
/// the settlement dispatcher mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treasury {
    pub authority: AccountAddress,
    pub total_fees_collected: u64,
    pub total_bounties_created: u32,
    pub total_bounties_completed: u32,
    pub total_volume: u64,
    pub total_expired_funds_reclaimed: u64,
}

impl Treasury {
    pub fn new(authority: AccountAddress) -> Self {
        Self {
            authority,
            total_fees_collected: 0,
            total_bounties_created: 0,
            total_bounties_completed: 0,
            total_volume: 0,
            total_expired_funds_reclaimed: 0,
        }
    }

    /// Account for a newly created escrow and its flat creation fee.
    pub fn note_created(&mut self, creation_fee: TokenAmount) -> Result<()> {
        self.total_fees_collected = self
            .total_fees_collected
            .checked_add(creation_fee.to_base_units())
            .ok_or(LedgerError::MathOverflow)?;
        self.total_bounties_created = self
            .total_bounties_created
            .checked_add(1)
            .ok_or(LedgerError::MathOverflow)?;
        Ok(())
    }

    /// Account for a settlement: the settled prize counts toward volume and
    /// the platform fee toward collected fees.
    pub fn note_settled(&mut self, prize: TokenAmount, platform_fee: TokenAmount) -> Result<()> {
        self.total_bounties_completed = self
            .total_bounties_completed
            .checked_add(1)
            .ok_or(LedgerError::MathOverflow)?;
        self.total_volume = self
            .total_volume
            .checked_add(prize.to_base_units())
            .ok_or(LedgerError::MathOverflow)?;
        self.total_fees_collected = self
            .total_fees_collected
            .checked_add(platform_fee.to_base_units())
            .ok_or(LedgerError::MathOverflow)?;
        Ok(())
    }

    /// Account for escrowed funds swept back after expiry.
    pub fn note_reclaimed(&mut self, amount: TokenAmount) -> Result<()> {
        self.total_expired_funds_reclaimed = self
            .total_expired_funds_reclaimed
            .checked_add(amount.to_base_units())
            .ok_or(LedgerError::MathOverflow)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let treasury = Treasury::new(AccountAddress::from_bytes([1; 32]));
        assert_eq!(treasury.total_fees_collected, 0);
        assert_eq!(treasury.total_bounties_created, 0);
        assert_eq!(treasury.total_bounties_completed, 0);
        assert_eq!(treasury.total_volume, 0);
        assert_eq!(treasury.total_expired_funds_reclaimed, 0);
    }

    #[test]
    fn test_counters_accumulate() {
        let mut treasury = Treasury::new(AccountAddress::from_bytes([1; 32]));

        treasury
            .note_created(TokenAmount::from_base_units(1_000_000))
            .unwrap();
        treasury
            .note_created(TokenAmount::from_base_units(1_000_000))
            .unwrap();
        assert_eq!(treasury.total_bounties_created, 2);
        assert_eq!(treasury.total_fees_collected, 2_000_000);

        treasury
            .note_settled(
                TokenAmount::from_base_units(10_000_000_000),
                TokenAmount::from_base_units(100_000_000),
            )
            .unwrap();
        assert_eq!(treasury.total_bounties_completed, 1);
        assert_eq!(treasury.total_volume, 10_000_000_000);
        assert_eq!(treasury.total_fees_collected, 102_000_000);

        treasury
            .note_reclaimed(TokenAmount::from_base_units(5_000))
            .unwrap();
        assert_eq!(treasury.total_expired_funds_reclaimed, 5_000);
    }

    #[test]
    fn test_counter_overflow_is_fatal() {
        let mut treasury = Treasury::new(AccountAddress::from_bytes([1; 32]));
        treasury.total_fees_collected = u64::MAX;

        let err = treasury
            .note_created(TokenAmount::from_base_units(1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::MathOverflow));
    }
}

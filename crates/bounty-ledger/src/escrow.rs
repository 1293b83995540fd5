use crate::error::{LedgerError, Result};
use crate::types::{
    AccountAddress, TokenAmount, BPS_DENOMINATOR, ESCROW_EXPIRY_SECONDS, MAX_HASH_LEN,
    PLATFORM_FEE_BPS,
};
use serde::{Deserialize, Serialize};

/// One escrowed bounty. The record has exactly two live states: open
/// (`completed == false`) and settled (`completed == true`); the transition
/// is one-way and fired only by `settle`. Escrowed funds live at the derived
/// escrow address, not inside this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escrow {
    pub funder: AccountAddress,
    pub description_hash: String,
    pub prize_amount: TokenAmount,
    pub deadline_timestamp: Option<i64>,
    pub winner: Option<AccountAddress>,
    pub completed: bool,
    pub created_at: i64,
    pub completed_at: Option<i64>,
    pub submission_hash: Option<String>,
    pub expiry_timestamp: i64,
    pub expired: bool,
}

impl Escrow {
    pub fn new(
        funder: AccountAddress,
        description_hash: String,
        prize_amount: TokenAmount,
        deadline_timestamp: Option<i64>,
        now: i64,
    ) -> Self {
        Self {
            funder,
            description_hash,
            prize_amount,
            deadline_timestamp,
            winner: None,
            completed: false,
            created_at: now,
            completed_at: None,
            submission_hash: None,
            expiry_timestamp: now + ESCROW_EXPIRY_SECONDS,
            expired: false,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.completed && !self.expired
    }

    /// Splits the prize into `(winner payout, platform fee)` using integer
    /// truncation. `payout + fee == prize_amount` holds for every input.
    pub fn split_prize(&self) -> Result<(TokenAmount, TokenAmount)> {
        let platform_fee = self
            .prize_amount
            .to_base_units()
            .checked_mul(PLATFORM_FEE_BPS as u64)
            .ok_or(LedgerError::MathOverflow)?
            .checked_div(BPS_DENOMINATOR)
            .ok_or(LedgerError::MathOverflow)?;
        let platform_fee = TokenAmount::from_base_units(platform_fee);

        let payout = self
            .prize_amount
            .checked_sub(platform_fee)
            .ok_or(LedgerError::MathOverflow)?;

        Ok((payout, platform_fee))
    }

    /// The one-way open→settled transition. Preconditions are checked in a
    /// fixed order, each with its own error: caller identity, completion,
    /// expiry, submission hash length.
    pub fn settle(
        &mut self,
        caller: AccountAddress,
        winner: AccountAddress,
        submission_hash: String,
        now: i64,
    ) -> Result<()> {
        if caller != self.funder {
            return Err(LedgerError::UnauthorizedCaller);
        }
        if self.completed {
            return Err(LedgerError::AlreadySettled);
        }
        if self.expired || now >= self.expiry_timestamp {
            return Err(LedgerError::Expired);
        }
        if submission_hash.len() > MAX_HASH_LEN {
            return Err(LedgerError::SubmissionHashTooLong {
                len: submission_hash.len(),
                max: MAX_HASH_LEN,
            });
        }

        self.winner = Some(winner);
        self.completed = true;
        self.completed_at = Some(now);
        self.submission_hash = Some(submission_hash);
        Ok(())
    }

    /// Marks an unclaimed escrow expired once its expiry timestamp passes.
    pub fn mark_reclaimed(&mut self, now: i64) -> Result<()> {
        if self.completed {
            return Err(LedgerError::AlreadySettled);
        }
        if self.expired {
            return Err(LedgerError::AlreadyReclaimed);
        }
        if now < self.expiry_timestamp {
            return Err(LedgerError::NotExpired);
        }

        self.expired = true;
        self.completed_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_escrow(prize: u64) -> Escrow {
        Escrow::new(
            AccountAddress::from_bytes([1; 32]),
            "QmDescription".to_string(),
            TokenAmount::from_base_units(prize),
            None,
            1_700_000_000,
        )
    }

    #[test]
    fn test_new_escrow_is_open() {
        let escrow = open_escrow(1_000);
        assert!(escrow.is_open());
        assert!(escrow.winner.is_none());
        assert_eq!(
            escrow.expiry_timestamp,
            escrow.created_at + ESCROW_EXPIRY_SECONDS
        );
    }

    #[test]
    fn test_split_prize_is_exact() {
        let escrow = open_escrow(10_000_000_000);
        let (payout, fee) = escrow.split_prize().unwrap();

        assert_eq!(fee, TokenAmount::from_base_units(100_000_000));
        assert_eq!(payout, TokenAmount::from_base_units(9_900_000_000));
        assert_eq!(payout.checked_add(fee).unwrap(), escrow.prize_amount);
    }

    #[test]
    fn test_split_prize_truncates() {
        // 99 * 100 / 10000 truncates to 0: the whole prize goes to the winner.
        let escrow = open_escrow(99);
        let (payout, fee) = escrow.split_prize().unwrap();
        assert_eq!(fee, TokenAmount::ZERO);
        assert_eq!(payout, TokenAmount::from_base_units(99));
    }

    #[test]
    fn test_settle_transitions_once() {
        let mut escrow = open_escrow(1_000);
        let funder = escrow.funder;
        let winner = AccountAddress::from_bytes([2; 32]);
        let now = escrow.created_at + 60;

        escrow
            .settle(funder, winner, "QmSubmission".to_string(), now)
            .unwrap();
        assert!(escrow.completed);
        assert_eq!(escrow.winner, Some(winner));
        assert_eq!(escrow.completed_at, Some(now));

        let err = escrow
            .settle(funder, winner, "QmSubmission".to_string(), now)
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadySettled));
    }

    #[test]
    fn test_settle_checks_caller_before_state() {
        let mut escrow = open_escrow(1_000);
        let funder = escrow.funder;
        let winner = AccountAddress::from_bytes([2; 32]);
        let stranger = AccountAddress::from_bytes([3; 32]);
        let now = escrow.created_at + 60;

        escrow
            .settle(funder, winner, "Qm".to_string(), now)
            .unwrap();

        // A stranger is rejected for who they are, even on a settled escrow.
        let err = escrow
            .settle(stranger, winner, "Qm".to_string(), now)
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnauthorizedCaller));
    }

    #[test]
    fn test_settle_after_expiry_fails() {
        let mut escrow = open_escrow(1_000);
        let funder = escrow.funder;
        let winner = AccountAddress::from_bytes([2; 32]);

        let err = escrow
            .settle(funder, winner, "Qm".to_string(), escrow.expiry_timestamp)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Expired));
    }

    #[test]
    fn test_settle_rejects_long_submission_hash() {
        let mut escrow = open_escrow(1_000);
        let funder = escrow.funder;
        let winner = AccountAddress::from_bytes([2; 32]);

        let err = escrow
            .settle(
                funder,
                winner,
                "x".repeat(MAX_HASH_LEN + 1),
                escrow.created_at + 1,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::SubmissionHashTooLong { .. }));
        assert!(!escrow.completed);
    }

    #[test]
    fn test_reclaim_lifecycle() {
        let mut escrow = open_escrow(1_000);

        let err = escrow.mark_reclaimed(escrow.created_at + 1).unwrap_err();
        assert!(matches!(err, LedgerError::NotExpired));

        escrow.mark_reclaimed(escrow.expiry_timestamp).unwrap();
        assert!(escrow.expired);
        assert!(!escrow.completed);

        let err = escrow
            .mark_reclaimed(escrow.expiry_timestamp + 1)
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyReclaimed));
    }

    #[test]
    fn test_reclaim_of_settled_escrow_fails() {
        let mut escrow = open_escrow(1_000);
        let funder = escrow.funder;
        escrow
            .settle(
                funder,
                AccountAddress::from_bytes([2; 32]),
                "Qm".to_string(),
                escrow.created_at + 1,
            )
            .unwrap();

        let err = escrow
            .mark_reclaimed(escrow.expiry_timestamp + 1)
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadySettled));
    }
}

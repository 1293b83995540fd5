use crate::error::{LedgerError, Result};
use crate::types::AccountAddress;
use serde::{Deserialize, Serialize};

/// Per-worker reputation record. `bounties_completed` only ever grows, and
/// only the settlement path increments it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub worker: AccountAddress,
    pub bounties_completed: u32,
    pub created_at: i64,
}

impl WorkerProfile {
    pub fn new(worker: AccountAddress, now: i64) -> Self {
        Self {
            worker,
            bounties_completed: 0,
            created_at: now,
        }
    }

    pub fn note_completed(&mut self) -> Result<()> {
        self.bounties_completed = self
            .bounties_completed
            .checked_add(1)
            .ok_or(LedgerError::MathOverflow)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_starts_at_zero() {
        let profile = WorkerProfile::new(AccountAddress::from_bytes([5; 32]), 1_700_000_000);
        assert_eq!(profile.bounties_completed, 0);
    }

    #[test]
    fn test_note_completed_increments() {
        let mut profile = WorkerProfile::new(AccountAddress::from_bytes([5; 32]), 1_700_000_000);
        profile.note_completed().unwrap();
        profile.note_completed().unwrap();
        assert_eq!(profile.bounties_completed, 2);
    }

    #[test]
    fn test_counter_overflow_is_fatal() {
        let mut profile = WorkerProfile::new(AccountAddress::from_bytes([5; 32]), 1_700_000_000);
        profile.bounties_completed = u32::MAX;
        assert!(matches!(
            profile.note_completed().unwrap_err(),
            LedgerError::MathOverflow
        ));
    }
}

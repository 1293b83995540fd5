use crate::error::{LedgerError, Result};
use crate::storage::{LedgerStorage, TransactionRecord};
use crate::types::{AccountAddress, TokenAmount, TransferReason};
use std::sync::Arc;
use tracing::{debug, info};

/// Moves funds between addresses with checked arithmetic. Storage is the
/// single source of truth; there is no read cache, so a rolled-back
/// transaction leaves nothing stale behind.
pub struct BalanceManager {
    storage: Arc<dyn LedgerStorage>,
}

impl BalanceManager {
    pub fn new(storage: Arc<dyn LedgerStorage>) -> Self {
        Self { storage }
    }

    pub async fn get_balance(&self, address: AccountAddress) -> Result<TokenAmount> {
        Ok(self.storage.get_balance(address).await?)
    }

    pub async fn credit(&self, address: AccountAddress, amount: TokenAmount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let current = self.get_balance(address).await?;
        let new_balance = current
            .checked_add(amount)
            .ok_or(LedgerError::MathOverflow)?;

        self.storage.set_balance(address, new_balance).await?;

        info!(
            address = %address,
            amount = %amount,
            balance_after = %new_balance,
            "💰 Balance credited"
        );
        Ok(())
    }

    pub async fn debit(&self, address: AccountAddress, amount: TokenAmount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let current = self.get_balance(address).await?;
        let new_balance = current
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                address,
                needed: amount,
                available: current,
            })?;

        self.storage.set_balance(address, new_balance).await?;

        info!(
            address = %address,
            amount = %amount,
            balance_after = %new_balance,
            "💸 Balance debited"
        );
        Ok(())
    }

    /// Standalone atomic transfer, wrapped in its own storage transaction.
    /// Operations that already hold a transaction use `transfer_internal`.
    pub async fn transfer(
        &self,
        from: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
        reason: TransferReason,
    ) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        self.storage.begin_transaction().await?;

        match self.transfer_internal(from, to, amount).await {
            Ok(()) => {
                self.storage.commit_transaction().await?;
                // History is best-effort: the transfer itself has committed.
                if let Err(e) = self
                    .storage
                    .record_transaction(TransactionRecord::new(from, to, amount, reason))
                    .await
                {
                    debug!(error = %e, "Failed to record transaction");
                }
                Ok(())
            }
            Err(e) => {
                self.storage.rollback_transaction().await?;
                Err(e)
            }
        }
    }

    pub(crate) async fn transfer_internal(
        &self,
        from: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
    ) -> Result<()> {
        self.debit(from, amount).await?;
        self.credit(to, amount).await?;
        Ok(())
    }
}

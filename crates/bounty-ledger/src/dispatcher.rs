use crate::balance::BalanceManager;
use crate::error::{LedgerError, Result};
use crate::escrow::Escrow;
use crate::keys;
use crate::reputation::WorkerProfile;
use crate::storage::{LedgerStorage, TransactionRecord};
use crate::treasury::Treasury;
use crate::types::{
    AccountAddress, TokenAmount, TransferReason, BOUNTY_CREATION_FEE, MAX_HASH_LEN,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Sole mutator of treasury, escrow, and reputation records. Every operation
/// runs under the dispatcher lock and inside a storage transaction: either
/// all of its account mutations apply, or none do.
pub struct SettlementDispatcher {
    storage: Arc<dyn LedgerStorage>,
    balances: Arc<BalanceManager>,
    op_lock: Mutex<()>,
}

fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

impl SettlementDispatcher {
    pub fn new(storage: Arc<dyn LedgerStorage>, balances: Arc<BalanceManager>) -> Self {
        Self {
            storage,
            balances,
            op_lock: Mutex::new(()),
        }
    }

    /// One-time creation of the treasury singleton with all counters zeroed.
    pub async fn initialize_treasury(&self, authority: AccountAddress) -> Result<AccountAddress> {
        let _guard = self.op_lock.lock().await;

        if self.storage.get_treasury().await?.is_some() {
            return Err(LedgerError::AlreadyInitialized);
        }

        self.storage.put_treasury(Treasury::new(authority)).await?;

        let treasury_id = keys::treasury_address();
        info!(
            treasury = %treasury_id,
            authority = %authority,
            "🏦 Treasury initialized"
        );
        Ok(treasury_id)
    }

    /// Creates and funds an escrow in one atomic unit: creation fee to the
    /// treasury, prize into escrow custody, record written, counters bumped.
    pub async fn create_escrow(
        &self,
        funder: AccountAddress,
        description_hash: &str,
        prize_amount: TokenAmount,
        deadline_timestamp: Option<i64>,
    ) -> Result<AccountAddress> {
        let _guard = self.op_lock.lock().await;

        if description_hash.len() > MAX_HASH_LEN {
            return Err(LedgerError::DescriptionHashTooLong {
                len: description_hash.len(),
                max: MAX_HASH_LEN,
            });
        }
        if prize_amount.is_zero() {
            return Err(LedgerError::InvalidPrizeAmount);
        }

        let escrow_id = keys::escrow_address(funder, description_hash);
        let treasury_id = keys::treasury_address();

        self.storage.begin_transaction().await?;
        let result = self
            .create_escrow_inner(
                funder,
                escrow_id,
                treasury_id,
                description_hash,
                prize_amount,
                deadline_timestamp,
            )
            .await;

        match result {
            Ok(()) => {
                self.storage.commit_transaction().await?;
                self.record(funder, treasury_id, BOUNTY_CREATION_FEE, TransferReason::CreationFee)
                    .await;
                self.record(funder, escrow_id, prize_amount, TransferReason::EscrowDeposit)
                    .await;

                info!(
                    escrow = %escrow_id,
                    funder = %funder,
                    prize = %prize_amount,
                    "🆕 Escrow created"
                );
                Ok(escrow_id)
            }
            Err(e) => {
                self.storage.rollback_transaction().await?;
                Err(e)
            }
        }
    }

    async fn create_escrow_inner(
        &self,
        funder: AccountAddress,
        escrow_id: AccountAddress,
        treasury_id: AccountAddress,
        description_hash: &str,
        prize_amount: TokenAmount,
        deadline_timestamp: Option<i64>,
    ) -> Result<()> {
        let mut treasury = self
            .storage
            .get_treasury()
            .await?
            .ok_or(LedgerError::NotFound(treasury_id))?;

        if self.storage.get_escrow(escrow_id).await?.is_some() {
            return Err(LedgerError::AlreadyExists(escrow_id));
        }

        self.balances
            .transfer_internal(funder, treasury_id, BOUNTY_CREATION_FEE)
            .await?;
        self.balances
            .transfer_internal(funder, escrow_id, prize_amount)
            .await?;

        let escrow = Escrow::new(
            funder,
            description_hash.to_string(),
            prize_amount,
            deadline_timestamp,
            now_timestamp(),
        );
        self.storage.put_escrow(escrow_id, escrow).await?;

        treasury.note_created(BOUNTY_CREATION_FEE)?;
        self.storage.put_treasury(treasury).await?;

        Ok(())
    }

    /// Settles an open escrow: pays the winner the prize minus the platform
    /// fee, pays the fee to the treasury, flips the record to settled, and
    /// bumps the winner's reputation. Only the funder may call this, and only
    /// once per escrow.
    pub async fn select_winner(
        &self,
        caller: AccountAddress,
        escrow_id: AccountAddress,
        winner: AccountAddress,
        submission_hash: &str,
    ) -> Result<()> {
        let _guard = self.op_lock.lock().await;

        let treasury_id = keys::treasury_address();

        self.storage.begin_transaction().await?;
        let result = self
            .select_winner_inner(caller, escrow_id, treasury_id, winner, submission_hash)
            .await;

        match result {
            Ok((payout, platform_fee)) => {
                self.storage.commit_transaction().await?;
                self.record(escrow_id, winner, payout, TransferReason::WinnerPayout)
                    .await;
                self.record(escrow_id, treasury_id, platform_fee, TransferReason::PlatformFee)
                    .await;

                info!(
                    escrow = %escrow_id,
                    winner = %winner,
                    payout = %payout,
                    platform_fee = %platform_fee,
                    "🏆 Winner selected"
                );
                Ok(())
            }
            Err(e) => {
                self.storage.rollback_transaction().await?;
                Err(e)
            }
        }
    }

    async fn select_winner_inner(
        &self,
        caller: AccountAddress,
        escrow_id: AccountAddress,
        treasury_id: AccountAddress,
        winner: AccountAddress,
        submission_hash: &str,
    ) -> Result<(TokenAmount, TokenAmount)> {
        let mut escrow = self
            .storage
            .get_escrow(escrow_id)
            .await?
            .ok_or(LedgerError::NotFound(escrow_id))?;

        let now = now_timestamp();
        escrow.settle(caller, winner, submission_hash.to_string(), now)?;
        let (payout, platform_fee) = escrow.split_prize()?;

        self.balances
            .transfer_internal(escrow_id, winner, payout)
            .await?;
        self.balances
            .transfer_internal(escrow_id, treasury_id, platform_fee)
            .await?;

        self.storage.put_escrow(escrow_id, escrow.clone()).await?;

        // Reputation record is created on the fly for first-time winners.
        let profile_id = keys::profile_address(winner);
        let mut profile = match self.storage.get_profile(profile_id).await? {
            Some(profile) => profile,
            None => WorkerProfile::new(winner, now),
        };
        profile.note_completed()?;
        self.storage.put_profile(profile_id, profile).await?;

        let mut treasury = self
            .storage
            .get_treasury()
            .await?
            .ok_or(LedgerError::NotFound(treasury_id))?;
        treasury.note_settled(escrow.prize_amount, platform_fee)?;
        self.storage.put_treasury(treasury).await?;

        Ok((payout, platform_fee))
    }

    /// Sweeps the full custody balance of an unclaimed, expired escrow back
    /// to the treasury. Callable by anyone once the expiry timestamp passes.
    pub async fn reclaim_expired(&self, escrow_id: AccountAddress) -> Result<TokenAmount> {
        let _guard = self.op_lock.lock().await;

        let treasury_id = keys::treasury_address();

        self.storage.begin_transaction().await?;
        let result = self.reclaim_expired_inner(escrow_id, treasury_id).await;

        match result {
            Ok(reclaimed) => {
                self.storage.commit_transaction().await?;
                self.record(escrow_id, treasury_id, reclaimed, TransferReason::ExpiredReclaim)
                    .await;

                info!(
                    escrow = %escrow_id,
                    reclaimed = %reclaimed,
                    "⌛ Expired escrow reclaimed"
                );
                Ok(reclaimed)
            }
            Err(e) => {
                self.storage.rollback_transaction().await?;
                Err(e)
            }
        }
    }

    async fn reclaim_expired_inner(
        &self,
        escrow_id: AccountAddress,
        treasury_id: AccountAddress,
    ) -> Result<TokenAmount> {
        let mut escrow = self
            .storage
            .get_escrow(escrow_id)
            .await?
            .ok_or(LedgerError::NotFound(escrow_id))?;

        escrow.mark_reclaimed(now_timestamp())?;

        let reclaimed = self.balances.get_balance(escrow_id).await?;
        self.balances
            .transfer_internal(escrow_id, treasury_id, reclaimed)
            .await?;

        self.storage.put_escrow(escrow_id, escrow).await?;

        let mut treasury = self
            .storage
            .get_treasury()
            .await?
            .ok_or(LedgerError::NotFound(treasury_id))?;
        treasury.note_reclaimed(reclaimed)?;
        self.storage.put_treasury(treasury).await?;

        Ok(reclaimed)
    }

    /// Explicit reputation record creation; settlement also creates one on
    /// demand, so this exists for workers who want a profile before winning.
    pub async fn create_profile(&self, worker: AccountAddress) -> Result<AccountAddress> {
        let _guard = self.op_lock.lock().await;

        let profile_id = keys::profile_address(worker);

        if self.storage.get_profile(profile_id).await?.is_some() {
            return Err(LedgerError::AlreadyExists(profile_id));
        }

        self.storage
            .put_profile(profile_id, WorkerProfile::new(worker, now_timestamp()))
            .await?;

        info!(profile = %profile_id, worker = %worker, "👤 Worker profile created");
        Ok(profile_id)
    }

    pub async fn get_treasury(&self) -> Result<Option<Treasury>> {
        Ok(self.storage.get_treasury().await?)
    }

    pub async fn get_escrow(&self, escrow_id: AccountAddress) -> Result<Option<Escrow>> {
        Ok(self.storage.get_escrow(escrow_id).await?)
    }

    pub async fn get_profile(&self, worker: AccountAddress) -> Result<Option<WorkerProfile>> {
        Ok(self
            .storage
            .get_profile(keys::profile_address(worker))
            .await?)
    }

    /// History bookkeeping never fails the already-committed operation.
    async fn record(
        &self,
        from: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
        reason: TransferReason,
    ) {
        let tx = TransactionRecord::new(from, to, amount, reason);
        if let Err(e) = self.storage.record_transaction(tx).await {
            debug!(error = %e, "Failed to record transaction");
        }
    }
}

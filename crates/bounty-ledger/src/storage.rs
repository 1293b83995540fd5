use crate::escrow::Escrow;
use crate::reputation::WorkerProfile;
use crate::treasury::Treasury;
use crate::types::{AccountAddress, TokenAmount, TransferReason};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// One fund movement, kept for history queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub from: AccountAddress,
    pub to: AccountAddress,
    pub amount: TokenAmount,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: String,
    pub reason: TransferReason,
}

impl TransactionRecord {
    pub fn new(
        from: AccountAddress,
        to: AccountAddress,
        amount: TokenAmount,
        reason: TransferReason,
    ) -> Self {
        let timestamp = Utc::now();

        let mut hasher = blake3::Hasher::new();
        hasher.update(from.as_bytes());
        hasher.update(to.as_bytes());
        hasher.update(&amount.to_base_units().to_le_bytes());
        hasher.update(&timestamp.timestamp_millis().to_le_bytes());
        hasher.update(reason.to_string().as_bytes());
        let tx_hash = hex::encode(hasher.finalize().as_bytes());

        Self {
            from,
            to,
            amount,
            timestamp,
            tx_hash,
            reason,
        }
    }
}

type BalanceMap = HashMap<AccountAddress, TokenAmount>;
type EscrowMap = HashMap<AccountAddress, Escrow>;
type ProfileMap = HashMap<AccountAddress, WorkerProfile>;

#[async_trait]
pub trait LedgerStorage: Send + Sync {
    async fn get_balance(&self, address: AccountAddress) -> Result<TokenAmount>;
    async fn set_balance(&self, address: AccountAddress, balance: TokenAmount) -> Result<()>;
    async fn get_all_accounts(&self) -> Result<Vec<AccountAddress>>;

    async fn get_treasury(&self) -> Result<Option<Treasury>>;
    async fn put_treasury(&self, treasury: Treasury) -> Result<()>;

    async fn get_escrow(&self, address: AccountAddress) -> Result<Option<Escrow>>;
    async fn put_escrow(&self, address: AccountAddress, escrow: Escrow) -> Result<()>;

    async fn get_profile(&self, address: AccountAddress) -> Result<Option<WorkerProfile>>;
    async fn put_profile(&self, address: AccountAddress, profile: WorkerProfile) -> Result<()>;

    async fn begin_transaction(&self) -> Result<()>;
    async fn commit_transaction(&self) -> Result<()>;
    async fn rollback_transaction(&self) -> Result<()>;

    async fn record_transaction(&self, tx: TransactionRecord) -> Result<()>;
    async fn get_transaction_history(
        &self,
        address: AccountAddress,
    ) -> Result<Vec<TransactionRecord>>;
}

#[derive(Clone)]
struct StateSnapshot {
    balances: BalanceMap,
    treasury: Option<Treasury>,
    escrows: EscrowMap,
    profiles: ProfileMap,
}

pub struct MemoryStorage {
    balances: Arc<RwLock<BalanceMap>>,
    treasury: Arc<RwLock<Option<Treasury>>>,
    escrows: Arc<RwLock<EscrowMap>>,
    profiles: Arc<RwLock<ProfileMap>>,
    snapshot: Arc<RwLock<Option<StateSnapshot>>>,
    history: Arc<RwLock<Vec<TransactionRecord>>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            balances: Arc::new(RwLock::new(HashMap::new())),
            treasury: Arc::new(RwLock::new(None)),
            escrows: Arc::new(RwLock::new(HashMap::new())),
            profiles: Arc::new(RwLock::new(HashMap::new())),
            snapshot: Arc::new(RwLock::new(None)),
            history: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn get_balance(&self, address: AccountAddress) -> Result<TokenAmount> {
        let balances = self.balances.read().await;
        Ok(balances.get(&address).copied().unwrap_or(TokenAmount::ZERO))
    }

    async fn set_balance(&self, address: AccountAddress, balance: TokenAmount) -> Result<()> {
        let mut balances = self.balances.write().await;
        if balance.is_zero() {
            balances.remove(&address);
        } else {
            balances.insert(address, balance);
        }
        Ok(())
    }

    async fn get_all_accounts(&self) -> Result<Vec<AccountAddress>> {
        let balances = self.balances.read().await;
        Ok(balances.keys().copied().collect())
    }

    async fn get_treasury(&self) -> Result<Option<Treasury>> {
        let treasury = self.treasury.read().await;
        Ok(treasury.clone())
    }

    async fn put_treasury(&self, new: Treasury) -> Result<()> {
        let mut treasury = self.treasury.write().await;
        *treasury = Some(new);
        Ok(())
    }

    async fn get_escrow(&self, address: AccountAddress) -> Result<Option<Escrow>> {
        let escrows = self.escrows.read().await;
        Ok(escrows.get(&address).cloned())
    }

    async fn put_escrow(&self, address: AccountAddress, escrow: Escrow) -> Result<()> {
        let mut escrows = self.escrows.write().await;
        escrows.insert(address, escrow);
        Ok(())
    }

    async fn get_profile(&self, address: AccountAddress) -> Result<Option<WorkerProfile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&address).cloned())
    }

    async fn put_profile(&self, address: AccountAddress, profile: WorkerProfile) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(address, profile);
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<()> {
        let balances = self.balances.read().await;
        let treasury = self.treasury.read().await;
        let escrows = self.escrows.read().await;
        let profiles = self.profiles.read().await;

        let mut snapshot = self.snapshot.write().await;
        *snapshot = Some(StateSnapshot {
            balances: balances.clone(),
            treasury: treasury.clone(),
            escrows: escrows.clone(),
            profiles: profiles.clone(),
        });

        debug!(
            accounts = balances.len(),
            escrows = escrows.len(),
            storage_type = "memory",
            "📝 Transaction began (snapshot created)"
        );
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        *snapshot = None;
        debug!(storage_type = "memory", "✅ Transaction committed");
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;

        if let Some(saved) = snapshot.take() {
            let mut balances = self.balances.write().await;
            let mut treasury = self.treasury.write().await;
            let mut escrows = self.escrows.write().await;
            let mut profiles = self.profiles.write().await;

            *balances = saved.balances;
            *treasury = saved.treasury;
            *escrows = saved.escrows;
            *profiles = saved.profiles;

            info!(
                storage_type = "memory",
                "❌ Transaction rolled back (snapshot restored)"
            );
        }

        Ok(())
    }

    async fn record_transaction(&self, tx: TransactionRecord) -> Result<()> {
        let mut history = self.history.write().await;
        debug!(
            from = %tx.from,
            to = %tx.to,
            amount = %tx.amount,
            reason = %tx.reason,
            tx_hash = %tx.tx_hash,
            storage_type = "memory",
            "📦 Transaction recorded"
        );
        history.push(tx);
        Ok(())
    }

    async fn get_transaction_history(
        &self,
        address: AccountAddress,
    ) -> Result<Vec<TransactionRecord>> {
        let history = self.history.read().await;
        let mut filtered: Vec<TransactionRecord> = history
            .iter()
            .filter(|tx| tx.from == address || tx.to == address)
            .cloned()
            .collect();
        filtered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(filtered)
    }
}

#[cfg(feature = "rocksdb")]
pub use rocks::RocksDbStorage;

#[cfg(feature = "rocksdb")]
mod rocks {
    use super::*;
    use anyhow::anyhow;
    use rocksdb::{IteratorMode, Options, WriteBatch, DB};

    const CF_BALANCES: &str = "balances";
    const CF_TREASURY: &str = "treasury";
    const CF_ESCROWS: &str = "escrows";
    const CF_PROFILES: &str = "profiles";
    const CF_TRANSACTIONS: &str = "transactions";

    const TREASURY_KEY: &[u8] = b"singleton";

    /// Buffered write-set: while a transaction is open, every write lands
    /// here and reads consult it first; commit flushes it as one WriteBatch,
    /// rollback drops it. `None` value means deletion.
    type PendingWrites = HashMap<(&'static str, Vec<u8>), Option<Vec<u8>>>;

    pub struct RocksDbStorage {
        db: Arc<DB>,
        pending: Arc<RwLock<Option<PendingWrites>>>,
    }

    impl RocksDbStorage {
        pub fn new(path: &str) -> Result<Self> {
            let mut opts = Options::default();
            opts.create_if_missing(true);
            opts.create_missing_column_families(true);

            let cf_names = vec![
                CF_BALANCES,
                CF_TREASURY,
                CF_ESCROWS,
                CF_PROFILES,
                CF_TRANSACTIONS,
            ];
            let db = DB::open_cf(&opts, path, cf_names)?;

            Ok(Self {
                db: Arc::new(db),
                pending: Arc::new(RwLock::new(None)),
            })
        }

        fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
            self.db
                .cf_handle(name)
                .ok_or_else(|| anyhow!("Column family not found: {}", name))
        }

        async fn read_value(&self, cf_name: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>> {
            {
                let pending = self.pending.read().await;
                if let Some(writes) = pending.as_ref() {
                    if let Some(value) = writes.get(&(cf_name, key.to_vec())) {
                        return Ok(value.clone());
                    }
                }
            }
            Ok(self.db.get_cf(self.cf(cf_name)?, key)?)
        }

        async fn write_value(
            &self,
            cf_name: &'static str,
            key: Vec<u8>,
            value: Option<Vec<u8>>,
        ) -> Result<()> {
            let mut pending = self.pending.write().await;
            if let Some(writes) = pending.as_mut() {
                writes.insert((cf_name, key), value);
                return Ok(());
            }
            drop(pending);

            match value {
                Some(bytes) => self.db.put_cf(self.cf(cf_name)?, key, bytes)?,
                None => self.db.delete_cf(self.cf(cf_name)?, key)?,
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LedgerStorage for RocksDbStorage {
        async fn get_balance(&self, address: AccountAddress) -> Result<TokenAmount> {
            match self.read_value(CF_BALANCES, address.as_bytes()).await? {
                Some(bytes) => {
                    let units = u64::from_le_bytes(bytes.as_slice().try_into()?);
                    Ok(TokenAmount::from_base_units(units))
                }
                None => Ok(TokenAmount::ZERO),
            }
        }

        async fn set_balance(&self, address: AccountAddress, balance: TokenAmount) -> Result<()> {
            let value = if balance.is_zero() {
                None
            } else {
                Some(balance.to_base_units().to_le_bytes().to_vec())
            };
            self.write_value(CF_BALANCES, address.as_bytes().to_vec(), value)
                .await
        }

        async fn get_all_accounts(&self) -> Result<Vec<AccountAddress>> {
            let mut seen = std::collections::HashSet::new();

            for item in self.db.iterator_cf(self.cf(CF_BALANCES)?, IteratorMode::Start) {
                let (key, _) = item?;
                if key.len() == 32 {
                    let mut bytes = [0u8; 32];
                    bytes.copy_from_slice(&key);
                    seen.insert(AccountAddress::from_bytes(bytes));
                }
            }

            // An open transaction may hold balances not yet flushed.
            let pending = self.pending.read().await;
            if let Some(writes) = pending.as_ref() {
                for ((cf_name, key), value) in writes {
                    if *cf_name == CF_BALANCES && key.len() == 32 {
                        let mut bytes = [0u8; 32];
                        bytes.copy_from_slice(key);
                        let address = AccountAddress::from_bytes(bytes);
                        if value.is_some() {
                            seen.insert(address);
                        } else {
                            seen.remove(&address);
                        }
                    }
                }
            }

            Ok(seen.into_iter().collect())
        }

        async fn get_treasury(&self) -> Result<Option<Treasury>> {
            match self.read_value(CF_TREASURY, TREASURY_KEY).await? {
                Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                None => Ok(None),
            }
        }

        async fn put_treasury(&self, treasury: Treasury) -> Result<()> {
            let bytes = serde_json::to_vec(&treasury)?;
            self.write_value(CF_TREASURY, TREASURY_KEY.to_vec(), Some(bytes))
                .await
        }

        async fn get_escrow(&self, address: AccountAddress) -> Result<Option<Escrow>> {
            match self.read_value(CF_ESCROWS, address.as_bytes()).await? {
                Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                None => Ok(None),
            }
        }

        async fn put_escrow(&self, address: AccountAddress, escrow: Escrow) -> Result<()> {
            let bytes = serde_json::to_vec(&escrow)?;
            self.write_value(CF_ESCROWS, address.as_bytes().to_vec(), Some(bytes))
                .await
        }

        async fn get_profile(&self, address: AccountAddress) -> Result<Option<WorkerProfile>> {
            match self.read_value(CF_PROFILES, address.as_bytes()).await? {
                Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                None => Ok(None),
            }
        }

        async fn put_profile(&self, address: AccountAddress, profile: WorkerProfile) -> Result<()> {
            let bytes = serde_json::to_vec(&profile)?;
            self.write_value(CF_PROFILES, address.as_bytes().to_vec(), Some(bytes))
                .await
        }

        async fn begin_transaction(&self) -> Result<()> {
            let mut pending = self.pending.write().await;
            *pending = Some(HashMap::new());
            debug!(storage_type = "rocksdb", "📝 Transaction began");
            Ok(())
        }

        async fn commit_transaction(&self) -> Result<()> {
            let mut pending = self.pending.write().await;
            if let Some(writes) = pending.take() {
                let mut batch = WriteBatch::default();
                for ((cf_name, key), value) in writes {
                    let cf = self.cf(cf_name)?;
                    match value {
                        Some(bytes) => batch.put_cf(cf, key, bytes),
                        None => batch.delete_cf(cf, key),
                    }
                }
                self.db.write(batch)?;
                debug!(storage_type = "rocksdb", "✅ Transaction committed");
            }
            Ok(())
        }

        async fn rollback_transaction(&self) -> Result<()> {
            let mut pending = self.pending.write().await;
            if pending.take().is_some() {
                info!(storage_type = "rocksdb", "❌ Transaction rolled back");
            }
            Ok(())
        }

        async fn record_transaction(&self, tx: TransactionRecord) -> Result<()> {
            // Zero-padded millis prefix keeps the CF ordered by time.
            let key = format!("{:020}:{}", tx.timestamp.timestamp_millis(), tx.tx_hash);
            let bytes = serde_json::to_vec(&tx)?;
            self.db
                .put_cf(self.cf(CF_TRANSACTIONS)?, key.as_bytes(), bytes)?;
            Ok(())
        }

        async fn get_transaction_history(
            &self,
            address: AccountAddress,
        ) -> Result<Vec<TransactionRecord>> {
            let mut transactions = Vec::new();

            for item in self
                .db
                .iterator_cf(self.cf(CF_TRANSACTIONS)?, IteratorMode::End)
            {
                let (_, value) = item?;
                let tx: TransactionRecord = serde_json::from_slice(&value)?;
                if tx.from == address || tx.to == address {
                    transactions.push(tx);
                }
            }

            Ok(transactions)
        }
    }
}

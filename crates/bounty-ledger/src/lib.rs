pub mod address_encoding;
pub mod balance;
pub mod dispatcher;
pub mod error;
pub mod escrow;
pub mod keys;
pub mod reputation;
pub mod storage;
pub mod treasury;
pub mod types;

pub use balance::BalanceManager;
pub use dispatcher::SettlementDispatcher;
pub use error::{LedgerError, Result};
pub use escrow::Escrow;
pub use reputation::WorkerProfile;
pub use treasury::Treasury;
pub use types::{
    AccountAddress, TokenAmount, TransferReason, BOUNTY_CREATION_FEE, ESCROW_EXPIRY_SECONDS,
    MAX_HASH_LEN, PLATFORM_FEE_BPS,
};

use std::sync::Arc;
use storage::LedgerStorage;

/// Everything wired together over one storage backend.
pub struct BountyLedger {
    pub storage: Arc<dyn LedgerStorage>,
    pub balances: Arc<BalanceManager>,
    pub dispatcher: Arc<SettlementDispatcher>,
}

impl BountyLedger {
    pub fn new(storage: Arc<dyn LedgerStorage>) -> Self {
        let balances = Arc::new(BalanceManager::new(storage.clone()));
        let dispatcher = Arc::new(SettlementDispatcher::new(storage.clone(), balances.clone()));

        Self {
            storage,
            balances,
            dispatcher,
        }
    }
}

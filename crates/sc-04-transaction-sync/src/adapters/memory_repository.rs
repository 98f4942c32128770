//! In-memory transaction repository.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{DraftTransaction, IncomingTransaction, Transaction, TxId};
use std::collections::HashMap;
use tracing::debug;

use crate::domain::RepositoryError;
use crate::ports::outbound::TransactionRepository;

#[derive(Default)]
struct State {
    transactions: HashMap<TxId, Transaction>,
    incoming: HashMap<TxId, IncomingTransaction>,
    drafts: HashMap<String, DraftTransaction>,
}

/// Process-local [`TransactionRepository`].
#[derive(Default)]
pub struct InMemoryTransactionRepository {
    state: RwLock<State>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_transaction(&self, transaction: Transaction) {
        self.state
            .write()
            .transactions
            .insert(transaction.id.clone(), transaction);
    }

    pub fn insert_incoming(&self, incoming: IncomingTransaction) {
        self.state
            .write()
            .incoming
            .insert(incoming.id.clone(), incoming);
    }

    pub fn insert_draft(&self, draft: DraftTransaction) {
        self.state.write().drafts.insert(draft.id.clone(), draft);
    }

    pub fn has_incoming(&self, id: &str) -> bool {
        self.state.read().incoming.contains_key(id)
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>, RepositoryError> {
        Ok(self.state.read().transactions.get(id).cloned())
    }

    async fn get_incoming_transaction(
        &self,
        id: &str,
    ) -> Result<Option<IncomingTransaction>, RepositoryError> {
        Ok(self.state.read().incoming.get(id).cloned())
    }

    async fn save_transaction(&self, transaction: &Transaction) -> Result<(), RepositoryError> {
        self.insert_transaction(transaction.clone());
        Ok(())
    }

    async fn process_incoming(&self, id: &str) -> Result<(), RepositoryError> {
        let mut state = self.state.write();
        let incoming = state
            .incoming
            .remove(id)
            .ok_or_else(|| RepositoryError::NotFound {
                kind: "incoming transaction",
                id: id.to_string(),
            })?;

        state
            .transactions
            .entry(incoming.id.clone())
            .or_insert_with(|| Transaction {
                inputs: incoming.inputs,
                ..Transaction::new(incoming.id, incoming.hex)
            });
        debug!(tx_id = %id, "Incoming transaction recorded");
        Ok(())
    }

    async fn get_draft(&self, id: &str) -> Result<Option<DraftTransaction>, RepositoryError> {
        Ok(self.state.read().drafts.get(id).cloned())
    }
}

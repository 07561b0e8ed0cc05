use crate::core::Transaction;
use std::collections::{BTreeMap, BTreeSet};

/// Pending transactions keyed by id ( K -> transaction id, V -> Transaction ).
///
/// The pool has no lock of its own: it lives inside the ledger state and is
/// only touched under the ledger's lock.
#[derive(Debug, Clone, Default)]
pub struct MemoryPool {
    inner: BTreeMap<u64, Transaction>,
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool::default()
    }

    /// Returns false and leaves the pool untouched when the id is taken
    pub fn add(&mut self, tx: Transaction) -> bool {
        if self.inner.contains_key(&tx.get_id()) {
            return false;
        }
        self.inner.insert(tx.get_id(), tx);
        true
    }

    pub fn contains_id(&self, id: u64) -> bool {
        self.inner.contains_key(&id)
    }

    /// Structural membership: same id and identical content
    pub fn contains(&self, tx: &Transaction) -> bool {
        self.inner.get(&tx.get_id()) == Some(tx)
    }

    /// Drops every pooled transaction structurally equal to one in `transactions`
    pub fn remove_all<'a, I>(&mut self, transactions: I) -> usize
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut removed = 0;
        for tx in transactions {
            if self.contains(tx) {
                self.inner.remove(&tx.get_id());
                removed += 1;
            }
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.inner.values()
    }

    pub fn snapshot(&self) -> BTreeSet<Transaction> {
        self.inner.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl FromIterator<Transaction> for MemoryPool {
    fn from_iter<T: IntoIterator<Item = Transaction>>(iter: T) -> Self {
        let mut pool = MemoryPool::new();
        for tx in iter {
            pool.add(tx);
        }
        pool
    }
}

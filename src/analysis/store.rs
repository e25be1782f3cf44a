//! Transaction registry
//!
//! States live in an arena in first-reference order; an index maps ids to
//! slots. Cross-transaction references are ids, never pointers.

use std::collections::HashMap;

use crate::codec::TransactionId;

use super::transaction::TransactionState;

#[derive(Debug, Default)]
pub struct TransactionStore {
    states: Vec<TransactionState>,
    index: HashMap<TransactionId, usize>,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing state, or a fresh one registered under `id`. Never fails.
    pub fn get_or_create(&mut self, id: TransactionId) -> &mut TransactionState {
        let slot = match self.index.get(&id) {
            Some(&slot) => slot,
            None => {
                self.states.push(TransactionState::new(id));
                let slot = self.states.len() - 1;
                self.index.insert(id, slot);
                slot
            }
        };
        &mut self.states[slot]
    }

    pub fn get(&self, id: &TransactionId) -> Option<&TransactionState> {
        self.index.get(id).map(|&slot| &self.states[slot])
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.index.contains_key(id)
    }

    /// States in first-reference order
    pub fn iter(&self) -> impl Iterator<Item = &TransactionState> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn committed_count(&self) -> usize {
        self.states.iter().filter(|s| s.is_committed()).count()
    }

    pub fn aborted_count(&self) -> usize {
        self.states.iter().filter(|s| s.aborted).count()
    }
}

use std::collections::BTreeMap;

use irongpt_core::domain::intent::{Intent, SlotKey, SlotValue};
use irongpt_core::errors::DomainError;

/// Collects slot answers for one intent.
///
/// The intent is fixed at construction. Recorded slots are only dropped by
/// discarding the whole manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotManager {
    intent: Intent,
    slots: BTreeMap<SlotKey, SlotValue>,
}

impl SlotManager {
    pub fn new(intent: Intent) -> Self {
        Self { intent, slots: BTreeMap::new() }
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    /// Unfilled slots of the intent's requirement row, in declared order.
    pub fn missing_slots(&self) -> Vec<SlotKey> {
        self.intent
            .required_slots()
            .iter()
            .copied()
            .filter(|key| !self.slots.contains_key(key))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_slots().is_empty()
    }

    /// Stores or overwrites `key`. Keys outside the intent's row are accepted.
    pub fn record_slot(&mut self, key: SlotKey, value: impl Into<SlotValue>) {
        self.slots.insert(key, value.into());
    }

    pub fn slot(&self, key: SlotKey) -> Option<&SlotValue> {
        self.slots.get(&key)
    }

    /// Copy of every recorded slot keyed by slot name, complete or not.
    pub fn build_function_args(&self) -> BTreeMap<String, SlotValue> {
        self.slots.iter().map(|(key, value)| (key.as_str().to_string(), value.clone())).collect()
    }

    pub fn try_build_function_args(&self) -> Result<BTreeMap<String, SlotValue>, DomainError> {
        let missing = self.missing_slots();
        if !missing.is_empty() {
            return Err(DomainError::PrematureExtraction { intent: self.intent, missing });
        }
        Ok(self.build_function_args())
    }
}

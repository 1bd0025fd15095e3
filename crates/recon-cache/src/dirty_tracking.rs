//! 髒標記追蹤

use std::collections::{BTreeMap, BTreeSet};

use crate::fingerprint::{Fingerprint, InputTable};

/// 髒標記追蹤器
///
/// 記錄哪些輸入表變更過，以及變更前（已過時）的指紋。
#[derive(Debug, Default)]
pub struct DirtyTracker {
    stale: BTreeMap<InputTable, BTreeSet<Fingerprint>>,
}

impl DirtyTracker {
    /// 創建新的追蹤器
    pub fn new() -> Self {
        Self::default()
    }

    /// 標記輸入表已變更（舊指紋作廢）
    pub fn mark_dirty(&mut self, table: InputTable, stale: Fingerprint) {
        self.stale.entry(table).or_default().insert(stale);
    }

    /// 檢查輸入表是否為髒
    pub fn is_dirty(&self, table: InputTable) -> bool {
        self.stale.contains_key(&table)
    }

    /// 獲取所有髒表
    pub fn dirty_tables(&self) -> Vec<InputTable> {
        self.stale.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stale.is_empty()
    }

    /// 清除所有髒標記
    pub fn clear(&mut self) {
        self.stale.clear();
    }

    /// 取出所有 (表, 過時指紋) 並清空
    pub fn drain(&mut self) -> Vec<(InputTable, Fingerprint)> {
        std::mem::take(&mut self.stale)
            .into_iter()
            .flat_map(|(table, prints)| prints.into_iter().map(move |fp| (table, fp)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_drain() {
        let mut tracker = DirtyTracker::new();
        let a = Fingerprint::of("a").unwrap();
        let b = Fingerprint::of("b").unwrap();

        tracker.mark_dirty(InputTable::Inventory, a.clone());
        tracker.mark_dirty(InputTable::Inventory, a.clone());
        tracker.mark_dirty(InputTable::Demand, b.clone());

        assert!(tracker.is_dirty(InputTable::Inventory));
        assert!(!tracker.is_dirty(InputTable::Config));
        assert_eq!(
            tracker.dirty_tables(),
            vec![InputTable::Demand, InputTable::Inventory]
        );

        let drained = tracker.drain();
        assert_eq!(drained.len(), 2);
        assert!(drained.contains(&(InputTable::Inventory, a)));
        assert!(tracker.is_empty());
    }
}

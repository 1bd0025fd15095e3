//! 結果緩存

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::dirty_tracking::DirtyTracker;
use crate::fingerprint::{Fingerprint, InputTable, RunKey};

/// 命中統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// 對帳結果緩存
#[derive(Debug)]
pub struct ResultCache<V> {
    entries: HashMap<RunKey, V>,
    stats: CacheStats,
}

impl<V> Default for ResultCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }
}

impl<V> ResultCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RunKey) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: RunKey, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    /// 命中時回傳緩存值，否則計算並存入
    pub fn get_or_compute<F>(&mut self, key: RunKey, compute: F) -> &V
    where
        F: FnOnce() -> V,
    {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                self.stats.hits += 1;
                tracing::debug!("緩存命中");
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                self.stats.misses += 1;
                tracing::debug!("緩存未命中，重新計算");
                entry.insert(compute())
            }
        }
    }

    /// 同 `get_or_compute`，計算失敗時不存入
    pub fn get_or_try_compute<F, E>(&mut self, key: RunKey, compute: F) -> Result<&V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                self.stats.hits += 1;
                tracing::debug!("緩存命中");
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                self.stats.misses += 1;
                tracing::debug!("緩存未命中，重新計算");
                Ok(entry.insert(compute()?))
            }
        }
    }

    pub fn invalidate(&mut self, key: &RunKey) -> Option<V> {
        self.entries.remove(key)
    }

    /// 移除某張表為指定指紋的所有項目，回傳移除數量
    pub fn invalidate_table(&mut self, table: InputTable, fingerprint: &Fingerprint) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|key, _| key.fingerprint(table) != fingerprint);
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::info!("緩存失效 {:?}: 移除 {} 筆", table, removed);
        }
        removed
    }

    /// 套用髒標記並清空追蹤器
    pub fn apply(&mut self, tracker: &mut DirtyTracker) -> usize {
        tracker
            .drain()
            .iter()
            .map(|(table, fp)| self.invalidate_table(*table, fp))
            .sum()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn key(demand: &str, inventory: &str) -> RunKey {
        let fp = |s: &str| Fingerprint::of(s).unwrap();
        RunKey {
            demand: fp(demand),
            inventory: fp(inventory),
            supply: fp(""),
            transactions: fp(""),
            config: fp("default"),
            scope: None,
        }
    }

    #[test]
    fn test_get_or_compute_runs_once() {
        let mut cache: ResultCache<u32> = ResultCache::new();
        let mut calls = 0;

        for _ in 0..3 {
            let value = *cache.get_or_compute(key("d", "i"), || {
                calls += 1;
                42
            });
            assert_eq!(value, 42);
        }

        assert_eq!(calls, 1);
        assert_eq!(cache.stats(), CacheStats { hits: 2, misses: 1 });
    }

    #[test]
    fn test_failed_compute_not_stored() {
        let mut cache: ResultCache<u32> = ResultCache::new();

        let err = cache.get_or_try_compute(key("d", "i"), || Err::<u32, &str>("boom"));
        assert_eq!(err, Err("boom"));
        assert!(cache.is_empty());

        let ok = cache.get_or_try_compute(key("d", "i"), || Ok::<u32, &str>(7));
        assert_eq!(ok, Ok(&7));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_single_key() {
        let mut cache = ResultCache::new();
        cache.insert(key("d1", "i"), 1);
        cache.insert(key("d2", "i"), 2);

        assert_eq!(cache.invalidate(&key("d1", "i")), Some(1));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key("d1", "i")).is_none());
    }

    #[rstest]
    #[case(InputTable::Inventory, "i1", 2)]
    #[case(InputTable::Demand, "d1", 1)]
    #[case(InputTable::Demand, "missing", 0)]
    fn test_invalidate_table(
        #[case] table: InputTable,
        #[case] stale: &str,
        #[case] removed: usize,
    ) {
        let mut cache = ResultCache::new();
        cache.insert(key("d1", "i1"), 1);
        cache.insert(key("d2", "i1"), 2);
        cache.insert(key("d3", "i2"), 3);

        let fp = Fingerprint::of(stale).unwrap();
        assert_eq!(cache.invalidate_table(table, &fp), removed);
        assert_eq!(cache.len(), 3 - removed);
    }

    #[test]
    fn test_apply_dirty_tracker() {
        let mut cache = ResultCache::new();
        cache.insert(key("d1", "i1"), 1);
        cache.insert(key("d2", "i2"), 2);
        let mut tracker = DirtyTracker::new();
        tracker.mark_dirty(InputTable::Inventory, Fingerprint::of("i1").unwrap());

        assert_eq!(cache.apply(&mut tracker), 1);
        assert!(tracker.is_empty());
        assert!(cache.get(&key("d2", "i2")).is_some());

        cache.clear();
        assert!(cache.is_empty());
    }
}

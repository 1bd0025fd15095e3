//! 供應池索引

use recon_core::{SourceKind, SubstituteMapping, SupplyPool, SupplyRow};
use std::collections::HashMap;

/// (物料, 中心, 儲位)
type PointKey = (String, String, String);

/// 單一來源的索引
#[derive(Debug, Default)]
struct PoolIndex {
    rows: Vec<SupplyRow>,
    by_material: HashMap<String, Vec<usize>>,
    by_point: HashMap<PointKey, Vec<usize>>,
}

impl PoolIndex {
    fn push(&mut self, row: SupplyRow) {
        let idx = self.rows.len();
        self.by_material
            .entry(row.material.clone())
            .or_default()
            .push(idx);
        self.by_point
            .entry((row.material.clone(), row.center.clone(), row.location.clone()))
            .or_default()
            .push(idx);
        self.rows.push(row);
    }

    fn select<'a>(
        &'a self,
        positions: Option<&'a Vec<usize>>,
    ) -> impl Iterator<Item = &'a SupplyRow> {
        positions
            .into_iter()
            .flatten()
            .map(move |&i| &self.rows[i])
    }
}

/// 供應池索引（每次執行建立一次，之後唯讀）
#[derive(Debug, Default)]
pub struct SupplyIndex {
    pools: HashMap<SourceKind, PoolIndex>,
    substitutes: HashMap<String, Vec<SubstituteMapping>>,
    has_substitutes: bool,
}

impl SupplyIndex {
    /// 建立索引；同一來源出現多次時資料列依序合併
    pub fn build(pools: &[SupplyPool], substitutes: &[SubstituteMapping]) -> Self {
        let mut index = Self::default();

        for pool in pools {
            let entry = index.pools.entry(pool.kind.clone()).or_default();
            for row in &pool.rows {
                entry.push(row.clone());
            }
        }

        for mapping in substitutes {
            index
                .substitutes
                .entry(mapping.material.clone())
                .or_default()
                .push(mapping.clone());
        }
        index.has_substitutes = !substitutes.is_empty();

        tracing::debug!(
            "供應池索引完成：來源 {} 個，替代料對照 {} 筆",
            index.pools.len(),
            substitutes.len()
        );

        index
    }

    /// 是否有提供該來源的資料
    pub fn has_source(&self, kind: &SourceKind) -> bool {
        match kind {
            SourceKind::Substitute => self.has_substitutes,
            other => self.pools.get(other).is_some_and(|p| !p.rows.is_empty()),
        }
    }

    /// 某來源中符合物料的所有列（保持輸入順序）
    pub fn rows_for_material<'a>(
        &'a self,
        kind: &SourceKind,
        material: &'a str,
    ) -> impl Iterator<Item = &'a SupplyRow> {
        self.pools
            .get(kind)
            .into_iter()
            .flat_map(move |pool| pool.select(pool.by_material.get(material)))
    }

    /// 某來源中 (物料, 中心, 儲位) 的所有列
    pub fn rows_at<'a>(
        &'a self,
        kind: &SourceKind,
        material: &str,
        center: &str,
        location: &str,
    ) -> impl Iterator<Item = &'a SupplyRow> {
        let key = (material.to_string(), center.to_string(), location.to_string());
        self.pools
            .get(kind)
            .into_iter()
            .flat_map(move |pool| pool.select(pool.by_point.get(&key)))
    }

    /// 來源是否列有該物料
    pub fn lists_material(&self, kind: &SourceKind, material: &str) -> bool {
        self.rows_for_material(kind, material).next().is_some()
    }

    /// 物料的替代料對照
    pub fn substitutes_for(&self, material: &str) -> &[SubstituteMapping] {
        self.substitutes
            .get(material)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

//! 可用數量解析
//!
//! 每種來源各有一條數量規則，透過查表取得，不在表中的來源解析為 0。

use recon_core::{ReconConfig, SourceKind, SupplyRow};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;

use crate::index::SupplyIndex;
use crate::snapshot::InventoryAggregator;

/// 解析查詢
#[derive(Debug, Clone, Copy)]
pub struct ResolveQuery<'a> {
    pub material: &'a str,
    pub center: &'a str,
    pub location: &'a str,
    pub lot: Option<&'a str>,
}

impl<'a> ResolveQuery<'a> {
    pub fn new(material: &'a str, center: &'a str, location: &'a str) -> Self {
        Self {
            material,
            center,
            location,
            lot: None,
        }
    }

    /// 建構器模式：設置批次
    pub fn with_lot(mut self, lot: &'a str) -> Self {
        self.lot = Some(lot);
        self
    }

    fn lot_str(&self) -> &'a str {
        self.lot.map(str::trim).unwrap_or("")
    }
}

/// 來源數量規則
pub trait QuantityResolver: Send + Sync + fmt::Debug {
    /// 解析可用數量（結果不小於 0）
    fn resolve(
        &self,
        kind: &SourceKind,
        query: &ResolveQuery<'_>,
        index: &SupplyIndex,
        inventory: &InventoryAggregator,
    ) -> recon_core::Result<Decimal>;
}

fn checked_sum<'a, I>(rows: I, query: &ResolveQuery<'_>) -> recon_core::Result<Decimal>
where
    I: Iterator<Item = &'a SupplyRow>,
{
    let mut total = Decimal::ZERO;
    for row in rows {
        total = total.checked_add(row.available_qty).ok_or_else(|| {
            recon_core::ReconError::CalculationError(format!(
                "可用數量加總溢位: {}/{}/{}",
                query.material, query.center, query.location
            ))
        })?;
    }
    Ok(total.max(Decimal::ZERO))
}

/// 批次精確比對：(物料, 中心, 儲位, 批次) 完全相同
#[derive(Debug, Clone, Copy, Default)]
pub struct LotExactResolver;

impl QuantityResolver for LotExactResolver {
    fn resolve(
        &self,
        kind: &SourceKind,
        query: &ResolveQuery<'_>,
        index: &SupplyIndex,
        _inventory: &InventoryAggregator,
    ) -> recon_core::Result<Decimal> {
        let lot = query.lot_str();
        let rows = index
            .rows_at(kind, query.material, query.center, query.location)
            .filter(|row| row.lot_str() == lot);
        checked_sum(rows, query)
    }
}

/// 定點來源：(物料, 中心, 儲位)，有批次時再依批次過濾
#[derive(Debug, Clone, Copy, Default)]
pub struct PointResolver;

impl QuantityResolver for PointResolver {
    fn resolve(
        &self,
        kind: &SourceKind,
        query: &ResolveQuery<'_>,
        index: &SupplyIndex,
        _inventory: &InventoryAggregator,
    ) -> recon_core::Result<Decimal> {
        let lot = query.lot_str();
        let rows = index
            .rows_at(kind, query.material, query.center, query.location)
            .filter(|row| lot.is_empty() || row.lot_str() == lot);
        checked_sum(rows, query)
    }
}

/// 調撥儲位彙總：跨所有中心加總調撥儲位的庫存，不看來源本身的資料
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkLocationResolver;

impl QuantityResolver for BulkLocationResolver {
    fn resolve(
        &self,
        _kind: &SourceKind,
        query: &ResolveQuery<'_>,
        _index: &SupplyIndex,
        inventory: &InventoryAggregator,
    ) -> recon_core::Result<Decimal> {
        Ok(inventory.bulk_total(query.material).max(Decimal::ZERO))
    }
}

/// 來源 → 規則 對照表
#[derive(Debug, Default)]
pub struct ResolverTable {
    resolvers: HashMap<SourceKind, Box<dyn QuantityResolver>>,
}

impl ResolverTable {
    /// 空表（所有來源解析為 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 標準規則：內建來源加上配置中宣告的其他庫存池
    pub fn standard(config: &ReconConfig) -> Self {
        let mut table = Self::new()
            .with_resolver(SourceKind::NearExpiry, Box::new(LotExactResolver))
            .with_resolver(SourceKind::SlowMoving, Box::new(BulkLocationResolver))
            .with_resolver(SourceKind::Substitute, Box::new(BulkLocationResolver))
            .with_resolver(SourceKind::Pnc, Box::new(PointResolver))
            .with_resolver(SourceKind::Expired, Box::new(PointResolver));

        for pool in &config.pool_sources {
            table.insert(SourceKind::Pool(pool.clone()), Box::new(PointResolver));
        }

        table
    }

    /// 建構器模式：設置某來源的規則
    pub fn with_resolver(
        mut self,
        kind: SourceKind,
        resolver: Box<dyn QuantityResolver>,
    ) -> Self {
        self.insert(kind, resolver);
        self
    }

    pub fn insert(&mut self, kind: SourceKind, resolver: Box<dyn QuantityResolver>) {
        self.resolvers.insert(kind, resolver);
    }

    pub fn contains(&self, kind: &SourceKind) -> bool {
        self.resolvers.contains_key(kind)
    }

    /// 規則表識別：(來源標籤, 規則的 Debug 輸出)，依來源排序
    ///
    /// 用於緩存鍵；自訂規則的 Debug 輸出需能區分不同行為。
    pub fn signature(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(&SourceKind, String)> = self
            .resolvers
            .iter()
            .map(|(kind, resolver)| (kind, format!("{:?}", resolver)))
            .collect();
        entries.sort();
        entries
            .into_iter()
            .map(|(kind, name)| (kind.label().to_string(), name))
            .collect()
    }

    /// 解析可用數量
    pub fn resolve(
        &self,
        kind: &SourceKind,
        query: &ResolveQuery<'_>,
        index: &SupplyIndex,
        inventory: &InventoryAggregator,
    ) -> recon_core::Result<Decimal> {
        match self.resolvers.get(kind) {
            Some(resolver) => resolver.resolve(kind, query, index, inventory),
            None => {
                tracing::debug!("來源 {} 沒有數量規則，解析為 0", kind);
                Ok(Decimal::ZERO)
            }
        }
    }
}

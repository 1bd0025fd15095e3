//! 庫存 / 在途彙總
//!
//! 庫存紀錄的唯讀投影。所有數字都是依群組加總，不存在的組合回傳 0。

use recon_core::{InventoryRecord, QtyBreakdown, ReconConfig, StockSnapshot, SummaryKey};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use crate::ReconWarning;

/// (中心, 物料, 儲位)
type PointKey = (String, String, String);

#[derive(Debug, Clone, Default)]
struct PointTotals {
    available: Decimal,
    transit: Decimal,
    description: String,
}

/// 有可用庫存的 (中心, 儲位, 物料)
#[derive(Debug, Clone, PartialEq)]
pub struct StockedPoint {
    pub key: SummaryKey,
    pub available: Decimal,
    pub transit: Decimal,
    pub description: String,
}

/// 庫存彙總器
#[derive(Debug)]
pub struct InventoryAggregator {
    config: ReconConfig,
    points: HashMap<PointKey, PointTotals>,
    /// (物料, 中心) → 調撥儲位庫存
    bulk: HashMap<(String, String), Decimal>,
    /// 物料 → 跨中心調撥儲位庫存
    bulk_total: HashMap<String, Decimal>,
    /// 因溢位而略過的紀錄
    warnings: Vec<ReconWarning>,
}

impl InventoryAggregator {
    /// 建立彙總
    ///
    /// 數量溢位的紀錄整筆略過並記錄警告，其餘紀錄照常加總。
    pub fn build(records: &[InventoryRecord], config: &ReconConfig) -> Self {
        let mut aggregator = Self {
            config: config.clone(),
            points: HashMap::new(),
            bulk: HashMap::new(),
            bulk_total: HashMap::new(),
            warnings: Vec::new(),
        };

        for record in records {
            if aggregator.add_record(record).is_none() {
                let subject = format!("{}/{}/{}", record.center, record.material, record.location);
                tracing::warn!("庫存數量溢位，略過紀錄 {}", subject);
                aggregator.warnings.push(ReconWarning::warning(
                    subject,
                    "庫存數量溢位，紀錄未計入彙總".to_string(),
                ));
            }
        }

        tracing::debug!(
            "庫存彙總完成：紀錄 {} 筆，儲位組合 {} 個，略過 {} 筆",
            records.len(),
            aggregator.points.len(),
            aggregator.warnings.len()
        );

        aggregator
    }

    /// 加入一筆紀錄，任一加總溢位時不做變更並回傳 None
    fn add_record(&mut self, record: &InventoryRecord) -> Option<()> {
        let available = record.available_qty()?;
        let point_key = (
            record.center.clone(),
            record.material.clone(),
            record.location.clone(),
        );

        let current = self.points.get(&point_key);
        let new_available = current
            .map_or(Decimal::ZERO, |p| p.available)
            .checked_add(available)?;
        let new_transit = current
            .map_or(Decimal::ZERO, |p| p.transit)
            .checked_add(record.in_transit_qty)?;

        let bulk_key = (record.material.clone(), record.center.clone());
        let new_bulk = if self.config.is_bulk_location(&record.location) {
            let at_center = self
                .bulk
                .get(&bulk_key)
                .copied()
                .unwrap_or(Decimal::ZERO)
                .checked_add(available)?;
            let across = self
                .bulk_total
                .get(&record.material)
                .copied()
                .unwrap_or(Decimal::ZERO)
                .checked_add(available)?;
            Some((at_center, across))
        } else {
            None
        };

        let totals = self.points.entry(point_key).or_default();
        totals.available = new_available;
        totals.transit = new_transit;
        if totals.description.is_empty() && !record.description.trim().is_empty() {
            totals.description = record.description.trim().to_string();
        }

        if let Some((at_center, across)) = new_bulk {
            self.bulk.insert(bulk_key, at_center);
            self.bulk_total.insert(record.material.clone(), across);
        }

        Some(())
    }

    /// 彙總時略過的紀錄
    pub fn warnings(&self) -> &[ReconWarning] {
        &self.warnings
    }

    fn point(&self, center: &str, material: &str, location: &str) -> Option<&PointTotals> {
        self.points
            .get(&(center.to_string(), material.to_string(), location.to_string()))
    }

    /// 某儲位的可用庫存
    pub fn stock_at(&self, center: &str, material: &str, location: &str) -> Decimal {
        self.point(center, material, location)
            .map(|p| p.available)
            .unwrap_or(Decimal::ZERO)
    }

    /// 某儲位的在途
    pub fn transit_at(&self, center: &str, material: &str, location: &str) -> Decimal {
        self.point(center, material, location)
            .map(|p| p.transit)
            .unwrap_or(Decimal::ZERO)
    }

    /// 某儲位第一個非空白描述
    pub fn description(&self, center: &str, material: &str, location: &str) -> Option<&str> {
        self.point(center, material, location)
            .map(|p| p.description.as_str())
            .filter(|d| !d.is_empty())
    }

    /// 中心內各主要儲位庫存
    pub fn stock_by_location(&self, center: &str, material: &str) -> QtyBreakdown {
        QtyBreakdown::from_keys(&self.config.primary_locations, |loc| {
            self.stock_at(center, material, loc)
        })
    }

    /// 中心內各主要儲位在途
    pub fn transit_by_location(&self, center: &str, material: &str) -> QtyBreakdown {
        QtyBreakdown::from_keys(&self.config.primary_locations, |loc| {
            self.transit_at(center, material, loc)
        })
    }

    /// 中心內主要儲位在途合計，溢位時為 None
    pub fn transit_total(&self, center: &str, material: &str) -> Option<Decimal> {
        self.transit_by_location(center, material).checked_total()
    }

    /// 某中心調撥儲位庫存
    pub fn bulk_at_center(&self, material: &str, center: &str) -> Decimal {
        self.bulk
            .get(&(material.to_string(), center.to_string()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// 跨中心調撥儲位庫存合計
    pub fn bulk_total(&self, material: &str) -> Decimal {
        self.bulk_total.get(material).copied().unwrap_or(Decimal::ZERO)
    }

    /// 各主要中心的調撥儲位庫存
    pub fn bulk_by_center(&self, material: &str) -> QtyBreakdown {
        QtyBreakdown::from_keys(&self.config.primary_centers, |center| {
            self.bulk_at_center(material, center)
        })
    }

    /// 調撥中心各儲位庫存
    pub fn redistribution_stock(&self, material: &str) -> QtyBreakdown {
        let center = &self.config.redistribution_center;
        QtyBreakdown::from_keys(&self.config.redistribution_locations, |loc| {
            self.stock_at(center, material, loc)
        })
    }

    /// 一條建議的完整快照
    ///
    /// `stock_material` 決定中心 / 在途 / 調撥欄位，
    /// `bulk_material` 決定各中心欄位。
    pub fn snapshot(
        &self,
        center: &str,
        stock_material: &str,
        bulk_material: &str,
    ) -> StockSnapshot {
        let transit_by_location = self.transit_by_location(center, stock_material);
        StockSnapshot {
            center: center.to_string(),
            stock_by_location: self.stock_by_location(center, stock_material),
            transit_total: transit_by_location.checked_total(),
            transit_by_location,
            redistribution_stock: self.redistribution_stock(stock_material),
            bulk_by_center: self.bulk_by_center(bulk_material),
        }
    }

    /// 可用庫存大於 0 的所有組合，依 (中心, 儲位, 物料) 排序
    pub fn stocked_points(&self) -> Vec<StockedPoint> {
        let sorted: BTreeMap<SummaryKey, &PointTotals> = self
            .points
            .iter()
            .filter(|(_, totals)| totals.available > Decimal::ZERO)
            .map(|((center, material, location), totals)| {
                (SummaryKey::new(center, location, material), totals)
            })
            .collect();

        sorted
            .into_iter()
            .map(|(key, totals)| StockedPoint {
                key,
                available: totals.available,
                transit: totals.transit,
                description: totals.description.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(center: &str, material: &str, location: &str, free: i64) -> InventoryRecord {
        InventoryRecord::new(
            center.to_string(),
            material.to_string(),
            location.to_string(),
            Decimal::from(free),
        )
    }

    fn sample() -> InventoryAggregator {
        let records = vec![
            record("1001", "100", "1030", 40).with_in_transit(Decimal::from(5)),
            record("1001", "100", "1030", 10).with_description("Gasa".to_string()),
            record("1001", "100", "1032", 8).with_in_transit(Decimal::from(2)),
            record("1001", "100", "1060", 7),
            record("1003", "100", "1031", 20).with_committed(Decimal::from(25)),
            record("1031", "100", "1030", 3),
            record("1031", "100", "1032", 4),
            record("1001", "100", "2000", 99).with_in_transit(Decimal::from(50)),
        ];
        InventoryAggregator::build(&records, &ReconConfig::default())
    }

    #[test]
    fn test_stock_and_transit_by_location() {
        let agg = sample();
        let stock = agg.stock_by_location("1001", "100");

        assert_eq!(stock.get("1030"), Decimal::from(50));
        assert_eq!(stock.get("1031"), Decimal::ZERO);
        assert_eq!(stock.get("1032"), Decimal::from(8));
        // 2000 不在主要儲位
        assert_eq!(agg.transit_total("1001", "100"), Some(Decimal::from(7)));
        assert_eq!(agg.transit_at("1001", "100", "2000"), Decimal::from(50));
    }

    #[test]
    fn test_committed_floor() {
        let agg = sample();
        // 20 - 25 取 0
        assert_eq!(agg.stock_at("1003", "100", "1031"), Decimal::ZERO);
    }

    #[test]
    fn test_bulk_aggregates() {
        let agg = sample();

        // 1030 + 1060 於 1001；1030 於 1031
        assert_eq!(agg.bulk_at_center("100", "1001"), Decimal::from(57));
        assert_eq!(agg.bulk_at_center("100", "1031"), Decimal::from(3));
        assert_eq!(agg.bulk_total("100"), Decimal::from(60));
        assert_eq!(agg.bulk_total("999"), Decimal::ZERO);

        let by_center = agg.bulk_by_center("100");
        assert_eq!(by_center.len(), 7);
        assert_eq!(by_center.get("1001"), Decimal::from(57));
        assert_eq!(by_center.get("1003"), Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_uses_separate_materials() {
        let agg = sample();
        let snap = agg.snapshot("1001", "100", "999");

        assert_eq!(snap.center, "1001");
        assert_eq!(snap.stock_by_location.get("1030"), Decimal::from(50));
        assert_eq!(snap.redistribution_stock.get("1030"), Decimal::from(3));
        assert_eq!(snap.redistribution_stock.get("1032"), Decimal::from(4));
        assert_eq!(snap.bulk_by_center.checked_total(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_stocked_points_sorted_and_positive() {
        let agg = sample();
        let points = agg.stocked_points();

        assert!(points.iter().all(|p| p.available > Decimal::ZERO));
        assert!(points.windows(2).all(|w| w[0].key < w[1].key));
        assert!(!points.iter().any(|p| p.key.center == "1003"));

        let first = &points[0];
        assert_eq!(first.key, SummaryKey::new("1001", "1030", "100"));
        assert_eq!(first.description, "Gasa");
    }

    #[test]
    fn test_empty_inventory() {
        let agg = InventoryAggregator::build(&[], &ReconConfig::default());

        assert_eq!(
            agg.stock_by_location("1001", "100").checked_total(),
            Some(Decimal::ZERO)
        );
        assert!(agg.warnings().is_empty());
        assert!(agg.stocked_points().is_empty());
    }

    #[test]
    fn test_overflow_record_skipped() {
        let records = vec![
            record("1001", "100", "1030", 0).with_in_transit(Decimal::MAX),
            record("1001", "100", "1030", 0).with_in_transit(Decimal::MAX),
            record("1001", "100", "1030", 6),
        ];
        let agg = InventoryAggregator::build(&records, &ReconConfig::default());

        // 第二筆溢位：整筆略過，第三筆照常加總
        assert_eq!(agg.warnings().len(), 1);
        assert_eq!(agg.warnings()[0].subject, "1001/100/1030");
        assert_eq!(agg.transit_at("1001", "100", "1030"), Decimal::MAX);
        assert_eq!(agg.stock_at("1001", "100", "1030"), Decimal::from(6));
    }

    #[test]
    fn test_bulk_overflow_leaves_other_materials() {
        let mut records = vec![
            record("1003", "999", "1030", 0),
            record("1003", "999", "1031", 0),
            record("1001", "100", "1030", 5),
        ];
        records[0].free_stock = Decimal::MAX;
        records[1].free_stock = Decimal::MAX;
        let agg = InventoryAggregator::build(&records, &ReconConfig::default());

        // 1030 與 1031 都是調撥儲位，第二筆使中心調撥合計溢位
        let subjects: Vec<&str> = agg.warnings().iter().map(|w| w.subject.as_str()).collect();
        assert_eq!(subjects, vec!["1003/999/1031"]);
        assert_eq!(agg.bulk_at_center("999", "1003"), Decimal::MAX);
        assert_eq!(agg.stock_at("1003", "999", "1031"), Decimal::ZERO);
        assert_eq!(agg.stock_at("1001", "100", "1030"), Decimal::from(5));
        assert_eq!(agg.bulk_total("100"), Decimal::from(5));
    }

    #[test]
    fn test_negative_overflow_skipped() {
        let mut bad = record("1001", "100", "1030", 0).with_committed(Decimal::MAX);
        bad.free_stock = Decimal::MIN;
        let agg = InventoryAggregator::build(&[bad], &ReconConfig::default());

        assert_eq!(agg.warnings().len(), 1);
        assert!(agg.stocked_points().is_empty());
    }

    #[test]
    fn test_transit_total_overflow_is_none() {
        let records = vec![
            record("1001", "100", "1030", 0).with_in_transit(Decimal::MAX),
            record("1001", "100", "1032", 0).with_in_transit(Decimal::MAX),
        ];
        let agg = InventoryAggregator::build(&records, &ReconConfig::default());
        let snap = agg.snapshot("1001", "100", "100");

        assert!(agg.warnings().is_empty());
        assert_eq!(agg.transit_total("1001", "100"), None);
        assert_eq!(snap.transit_total, None);
        assert_eq!(snap.transit_by_location.get("1032"), Decimal::MAX);
    }
}

//! 對帳彙總
//!
//! 彙總鍵是「有庫存」與「有未凍結未結需求」兩個集合的聯集。
//! 每列的庫存數字一律重新向庫存彙總器查詢，而不是沿用集合本身帶的值。

use rayon::prelude::*;
use recon_core::{
    ConsumptionStat, QtyBreakdown, ReconConfig, ReconError, SuggestionLine, SummaryKey,
    SummaryOrigin, SummaryRow,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::snapshot::InventoryAggregator;
use crate::{ReconWarning, SummaryOutcome};

/// 彙總建構器
#[derive(Debug, Clone)]
pub struct SummaryBuilder {
    config: ReconConfig,
}

/// 可計入未結的基準列：無凍結且未結 > 0
fn is_open_unblocked(line: &SuggestionLine) -> bool {
    line.is_baseline() && line.block_status.is_clear() && line.demand.pending_qty > Decimal::ZERO
}

fn demand_key(line: &SuggestionLine) -> SummaryKey {
    let d = &line.demand;
    SummaryKey::new(d.center.trim(), d.location.trim(), d.material.trim())
}

impl SummaryBuilder {
    pub fn new(config: ReconConfig) -> Self {
        Self { config }
    }

    /// 產生對帳彙總
    pub fn build(
        &self,
        suggestions: &[SuggestionLine],
        inventory: &InventoryAggregator,
        stats: &[ConsumptionStat],
    ) -> SummaryOutcome {
        tracing::info!(
            "開始對帳彙總：建議列 {} 筆，消耗統計 {} 筆",
            suggestions.len(),
            stats.len()
        );
        let start_time = std::time::Instant::now();
        let mut warnings = Vec::new();

        // Step 1: 有庫存的組合
        let stocked = Self::stock_rows(inventory);
        tracing::debug!("Step 1: 有庫存組合 {} 個", stocked.len());

        // Step 2: 有未結需求的組合
        let demanded = Self::demand_rows(suggestions, &mut warnings);
        tracing::debug!("Step 2: 未結需求組合 {} 個", demanded.len());

        // Step 3: 合併
        let merged = Self::merge_priority(stocked, demanded);

        // Step 4-7: 消耗統計、庫存數字、涵蓋月數、各中心未結
        let stat_index = Self::index_stats(stats, &mut warnings);
        let pending = self.pending_by_center(suggestions);

        let mut rows: Vec<SummaryRow> = merged.into_values().collect();
        let enrich_warnings: Vec<ReconWarning> = rows
            .par_iter_mut()
            .filter_map(|row| {
                if let Some(stat) = stat_index.get(&row.key) {
                    row.apply_stat(stat);
                }
                self.enrich(row, inventory, &pending)
            })
            .collect();
        warnings.extend(enrich_warnings);

        tracing::info!(
            "對帳彙總完成，彙總列 {} 筆，耗時 {:?}",
            rows.len(),
            start_time.elapsed()
        );

        SummaryOutcome { rows, warnings }
    }

    /// 有可用庫存的組合（集合 A）
    fn stock_rows(inventory: &InventoryAggregator) -> BTreeMap<SummaryKey, SummaryRow> {
        inventory
            .stocked_points()
            .into_iter()
            .map(|point| {
                let mut row = SummaryRow::empty(point.key.clone(), SummaryOrigin::Inventory);
                row.description = point.description;
                (point.key, row)
            })
            .collect()
    }

    /// 有未凍結未結需求的組合（集合 B）
    fn demand_rows(
        suggestions: &[SuggestionLine],
        warnings: &mut Vec<ReconWarning>,
    ) -> BTreeMap<SummaryKey, SummaryRow> {
        let mut groups: BTreeMap<SummaryKey, Vec<&SuggestionLine>> = BTreeMap::new();
        for line in suggestions.iter().filter(|l| is_open_unblocked(l)) {
            groups.entry(demand_key(line)).or_default().push(line);
        }

        let mut rows = BTreeMap::new();
        for (key, lines) in groups {
            match Self::demand_row(&key, &lines) {
                Ok(row) => {
                    rows.insert(key, row);
                }
                Err(e) => {
                    tracing::error!(
                        "未結需求彙總失敗 {}/{}/{}: {}",
                        key.center,
                        key.location,
                        key.material,
                        e
                    );
                    warnings.push(ReconWarning::error(
                        format!("{}/{}/{}", key.center, key.location, key.material),
                        e.to_string(),
                    ));
                }
            }
        }
        rows
    }

    fn demand_row(key: &SummaryKey, lines: &[&SuggestionLine]) -> recon_core::Result<SummaryRow> {
        let overflow = || {
            ReconError::CalculationError(format!(
                "未結金額溢位: {}/{}/{}",
                key.center, key.location, key.material
            ))
        };

        let mut row = SummaryRow::empty(key.clone(), SummaryOrigin::Demand);
        let mut orders: HashSet<&str> = HashSet::new();

        for line in lines {
            let d = &line.demand;
            orders.insert(d.order_id.as_str());
            row.pending_qty = row.pending_qty.checked_add(d.pending_qty).ok_or_else(overflow)?;
            let amount = d.pending_qty.checked_mul(d.unit_price).ok_or_else(overflow)?;
            row.pending_amount = row.pending_amount.checked_add(amount).ok_or_else(overflow)?;
            if row.description.is_empty() {
                row.description = d.description.trim().to_string();
            }
        }

        row.order_count = orders.len();
        Ok(row)
    }

    /// 合併庫存集合與需求集合
    ///
    /// 同鍵時保留庫存列（來源標為庫存），需求數字與缺少的描述由需求列補上。
    pub fn merge_priority(
        stocked: BTreeMap<SummaryKey, SummaryRow>,
        demanded: BTreeMap<SummaryKey, SummaryRow>,
    ) -> BTreeMap<SummaryKey, SummaryRow> {
        let mut merged = stocked;

        for (key, demand_row) in demanded {
            match merged.get_mut(&key) {
                Some(stock_row) => {
                    stock_row.order_count = demand_row.order_count;
                    stock_row.pending_qty = demand_row.pending_qty;
                    stock_row.pending_amount = demand_row.pending_amount;
                    if stock_row.description.is_empty() {
                        stock_row.description = demand_row.description;
                    }
                }
                None => {
                    merged.insert(key, demand_row);
                }
            }
        }

        merged
    }

    fn index_stats<'a>(
        stats: &'a [ConsumptionStat],
        warnings: &mut Vec<ReconWarning>,
    ) -> HashMap<SummaryKey, &'a ConsumptionStat> {
        let mut index = HashMap::with_capacity(stats.len());
        let mut duplicates = 0usize;

        for stat in stats {
            let key = SummaryKey::new(&stat.center, &stat.location, &stat.material);
            if index.contains_key(&key) {
                duplicates += 1;
                continue;
            }
            index.insert(key, stat);
        }

        if duplicates > 0 {
            tracing::warn!("消耗統計有 {} 筆重複鍵，保留第一筆", duplicates);
            warnings.push(ReconWarning::warning(
                "consumption".to_string(),
                format!("{} 筆重複的消耗統計鍵", duplicates),
            ));
        }

        index
    }

    /// 各主要中心的未凍結未結數量
    ///
    /// 同一 (物料, 儲位, 訂單) 只取第一筆，再依 (中心, 物料, 儲位) 加總。
    pub fn pending_by_center(
        &self,
        suggestions: &[SuggestionLine],
    ) -> HashMap<SummaryKey, Decimal> {
        let mut seen: HashSet<(&str, &str, &str, &str)> = HashSet::new();
        let mut totals: HashMap<SummaryKey, Decimal> = HashMap::new();

        for line in suggestions.iter().filter(|l| is_open_unblocked(l)) {
            let d = &line.demand;
            let center = d.center.trim();
            if !self.config.primary_centers.iter().any(|c| c == center) {
                continue;
            }

            let material = d.material.trim();
            let location = d.location.trim();
            if !seen.insert((center, material, location, d.order_id.as_str())) {
                continue;
            }

            let total = totals
                .entry(SummaryKey::new(center, location, material))
                .or_default();
            *total = total.saturating_add(d.pending_qty);
        }

        totals
    }

    /// 涵蓋月數
    pub fn coverage(&self, stock: Decimal, trailing_avg: Decimal) -> Decimal {
        if trailing_avg > Decimal::ZERO {
            stock
                .checked_div(trailing_avg)
                .map(|c| c.round_dp(2))
                .unwrap_or(self.config.coverage_sentinel)
        } else if stock.is_zero() {
            Decimal::ZERO
        } else {
            self.config.coverage_sentinel
        }
    }

    /// 填入庫存數字、涵蓋月數與各中心未結
    ///
    /// 庫存合計溢位時涵蓋月數為 0，並回傳警告。
    fn enrich(
        &self,
        row: &mut SummaryRow,
        inventory: &InventoryAggregator,
        pending: &HashMap<SummaryKey, Decimal>,
    ) -> Option<ReconWarning> {
        let SummaryKey {
            center,
            location,
            material,
        } = &row.key;

        row.stock_by_location = inventory.stock_by_location(center, material);
        row.transit_at_location = if self.config.is_primary_location(location) {
            inventory.transit_at(center, material, location)
        } else {
            Decimal::ZERO
        };
        row.redistribution_stock = inventory.redistribution_stock(material);
        let warning = match row.stock_by_location.checked_total() {
            Some(stock) => {
                row.coverage_months = self.coverage(stock, row.trailing_avg);
                None
            }
            None => {
                tracing::warn!("庫存合計溢位 {}/{}/{}", center, location, material);
                row.coverage_months = Decimal::ZERO;
                Some(ReconWarning::warning(
                    format!("{}/{}/{}", center, location, material),
                    "庫存合計溢位，涵蓋月數無法計算".to_string(),
                ))
            }
        };

        let own = pending.get(&row.key).copied().unwrap_or(Decimal::ZERO);
        row.pending_by_center = QtyBreakdown::from_keys(&self.config.primary_centers, |c| {
            if c == center.as_str() {
                own
            } else {
                Decimal::ZERO
            }
        });

        warning
    }
}

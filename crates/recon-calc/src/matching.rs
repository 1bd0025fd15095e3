//! 供應建議比對
//!
//! 每條需求行先輸出一條基準列，再依配置的來源順序搜尋候選供應。
//! 替代料與慢動料本身只是候選清單，
//! 會再到其他來源找該物料的實際批次（兩段式組合）。

use rayon::prelude::*;
use recon_core::normalize::format_expiry;
use recon_core::{
    BlockStatus, CombinationPolicy, DemandLine, ReconConfig, SourceKind, SuggestionLine,
    SuggestionSource, SupplyRow,
};
use rust_decimal::Decimal;

use crate::index::SupplyIndex;
use crate::resolver::{ResolveQuery, ResolverTable};
use crate::snapshot::InventoryAggregator;
use crate::{MatchOutcome, ReconWarning};

/// 建議列的供應位置
struct Placement<'a> {
    center: &'a str,
    location: &'a str,
    lot: &'a str,
    expiry: &'a str,
}

impl<'a> Placement<'a> {
    fn from_row(row: &'a SupplyRow) -> Self {
        Self {
            center: row.center.trim(),
            location: row.location.trim(),
            lot: row.lot_str(),
            expiry: row.expiry.as_deref().unwrap_or(""),
        }
    }

    fn unplaced() -> Self {
        Self {
            center: "",
            location: "",
            lot: "",
            expiry: "",
        }
    }

    fn query(&self, material: &'a str) -> ResolveQuery<'a> {
        ResolveQuery::new(material, self.center, self.location).with_lot(self.lot)
    }
}

/// 單條需求行的比對結果
struct LineResult {
    baseline: SuggestionLine,
    sourced: recon_core::Result<Vec<SuggestionLine>>,
}

/// 比對引擎
#[derive(Debug)]
pub struct MatchingEngine {
    config: ReconConfig,
    resolvers: ResolverTable,
}

impl MatchingEngine {
    /// 創建比對引擎（使用標準數量規則）
    pub fn new(config: ReconConfig) -> Self {
        let resolvers = ResolverTable::standard(&config);
        Self { config, resolvers }
    }

    /// 建構器模式：設置數量規則表
    pub fn with_resolvers(mut self, resolvers: ResolverTable) -> Self {
        self.resolvers = resolvers;
        self
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    /// 數量規則表識別
    pub fn resolver_signature(&self) -> Vec<(String, String)> {
        self.resolvers.signature()
    }

    /// 對所有需求行產生建議
    ///
    /// 輸出依需求輸入順序排列；每條需求行的基準列一定在其建議列之前。
    pub fn run(
        &self,
        demands: &[DemandLine],
        index: &SupplyIndex,
        inventory: &InventoryAggregator,
    ) -> MatchOutcome {
        tracing::info!(
            "開始供應建議比對：需求 {} 筆，啟用來源 {} 個",
            demands.len(),
            self.config.active_sources.len()
        );
        let start_time = std::time::Instant::now();

        let results: Vec<LineResult> = demands
            .par_iter()
            .map(|demand| self.match_line(demand, index, inventory))
            .collect();

        let mut outcome = MatchOutcome::empty();
        for (demand, result) in demands.iter().zip(results) {
            let subject = format!("{}/{}", demand.order_id, demand.material);
            let first = outcome.suggestions.len();
            outcome.suggestions.push(result.baseline);
            match result.sourced {
                Ok(lines) => outcome.suggestions.extend(lines),
                Err(e) => {
                    tracing::warn!(
                        "需求 {} 物料 {} 比對失敗，只保留基準列: {}",
                        demand.order_id,
                        demand.material,
                        e
                    );
                    outcome.add_warning(ReconWarning::warning(subject.clone(), e.to_string()));
                }
            }

            let unavailable = outcome.suggestions[first..]
                .iter()
                .filter(|line| line.snapshot.transit_total.is_none())
                .count();
            if unavailable > 0 {
                tracing::warn!("需求 {} 在途合計溢位，{} 列留空", subject, unavailable);
                outcome.add_warning(ReconWarning::warning(
                    subject,
                    format!("在途合計溢位，{} 列的在途合計留空", unavailable),
                ));
            }
        }

        outcome.calculation_time_ms = Some(start_time.elapsed().as_millis());
        tracing::info!(
            "供應建議比對完成，建議列 {} 筆，警告 {} 筆，耗時 {:?}",
            outcome.suggestions.len(),
            outcome.warnings.len(),
            start_time.elapsed()
        );

        outcome
    }

    fn match_line(
        &self,
        demand: &DemandLine,
        index: &SupplyIndex,
        inventory: &InventoryAggregator,
    ) -> LineResult {
        let block = demand.block_status(&self.config.credit_block_code);
        let material = demand.material.trim();
        let snapshot = inventory.snapshot(demand.center.trim(), material, material);
        let baseline = SuggestionLine::baseline(demand.clone(), snapshot, block);

        let sourced = if material.is_empty() {
            Ok(Vec::new())
        } else {
            self.sourced_lines(demand, material, block, index, inventory)
        };

        LineResult { baseline, sourced }
    }

    fn sourced_lines(
        &self,
        demand: &DemandLine,
        material: &str,
        block: BlockStatus,
        index: &SupplyIndex,
        inventory: &InventoryAggregator,
    ) -> recon_core::Result<Vec<SuggestionLine>> {
        let mut lines = Vec::new();

        for kind in &self.config.active_sources {
            if !index.has_source(kind) {
                continue;
            }

            match kind {
                SourceKind::Substitute => {
                    for mapping in index.substitutes_for(material) {
                        let substitute = mapping.substitute_material.trim();
                        if substitute.is_empty() {
                            continue;
                        }
                        lines.extend(self.combine(
                            demand,
                            SourceKind::Substitute,
                            substitute,
                            mapping.substitute_description.trim(),
                            self.config.substitute_policy,
                            block,
                            index,
                            inventory,
                        )?);
                    }
                }
                SourceKind::SlowMoving => {
                    if index.lists_material(kind, material) {
                        lines.extend(self.combine(
                            demand,
                            SourceKind::SlowMoving,
                            material,
                            "",
                            self.config.slow_moving_policy,
                            block,
                            index,
                            inventory,
                        )?);
                    }
                }
                point => {
                    for row in index.rows_for_material(point, material) {
                        let placement = Placement::from_row(row);
                        let available = self.resolvers.resolve(
                            point,
                            &placement.query(material),
                            index,
                            inventory,
                        )?;
                        lines.push(self.sourced_line(
                            demand,
                            SuggestionSource::Single(point.clone()),
                            material,
                            row.description.trim(),
                            &placement,
                            available,
                            block,
                            inventory,
                        ));
                    }
                }
            }
        }

        Ok(lines)
    }

    /// 兩段式組合：在其他來源中尋找目標物料
    ///
    /// 都找不到時輸出一條只標示主要來源的列，數量取調撥儲位彙總。
    #[allow(clippy::too_many_arguments)]
    fn combine(
        &self,
        demand: &DemandLine,
        primary: SourceKind,
        target: &str,
        description: &str,
        policy: CombinationPolicy,
        block: BlockStatus,
        index: &SupplyIndex,
        inventory: &InventoryAggregator,
    ) -> recon_core::Result<Vec<SuggestionLine>> {
        let mut lines = Vec::new();
        let mut found = false;

        for via in self.config.combinable_sources() {
            if !index.has_source(&via) {
                continue;
            }

            let rows: Vec<&SupplyRow> = index.rows_for_material(&via, target).collect();
            if rows.is_empty() {
                continue;
            }
            found = true;

            for row in rows {
                let placement = Placement::from_row(row);
                let available =
                    self.resolvers
                        .resolve(&via, &placement.query(target), index, inventory)?;
                let line_description = if description.is_empty() {
                    row.description.trim()
                } else {
                    description
                };
                lines.push(self.sourced_line(
                    demand,
                    SuggestionSource::Combined(primary.clone(), via.clone()),
                    target,
                    line_description,
                    &placement,
                    available,
                    block,
                    inventory,
                ));
            }

            if policy == CombinationPolicy::FirstMatch {
                break;
            }
        }

        if !found {
            let placement = Placement::unplaced();
            let available = self.resolvers.resolve(
                &primary,
                &ResolveQuery::new(target, "", ""),
                index,
                inventory,
            )?;
            lines.push(self.sourced_line(
                demand,
                SuggestionSource::Single(primary),
                target,
                description,
                &placement,
                available,
                block,
                inventory,
            ));
        }

        Ok(lines)
    }

    #[allow(clippy::too_many_arguments)]
    fn sourced_line(
        &self,
        demand: &DemandLine,
        source: SuggestionSource,
        suggested_material: &str,
        suggested_description: &str,
        placement: &Placement<'_>,
        available: Decimal,
        block: BlockStatus,
        inventory: &InventoryAggregator,
    ) -> SuggestionLine {
        let requested = demand.material.trim();
        let stock_material = if source.is_substitute_derived() {
            suggested_material
        } else {
            requested
        };
        let bulk_material = if suggested_material.is_empty() {
            requested
        } else {
            suggested_material
        };

        SuggestionLine {
            demand: demand.clone(),
            source,
            suggested_material: suggested_material.to_string(),
            suggested_description: suggested_description.to_string(),
            suggested_center: placement.center.to_string(),
            suggested_location: placement.location.to_string(),
            available_qty: available,
            lot: placement.lot.to_string(),
            expiry: format_expiry(placement.expiry),
            offerable_qty: demand.offerable(available),
            snapshot: inventory.snapshot(demand.center.trim(), stock_material, bulk_material),
            block_status: block,
        }
    }
}

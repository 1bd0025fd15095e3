//! 消耗統計（中心 / 物料 / 儲位）

use chrono::{Months, NaiveDate};
use rayon::prelude::*;
use recon_core::{ConsumptionStat, MonthPeriod, ReconConfig, ReconError, Transaction};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

use crate::{ConsumptionOutcome, ReconWarning};

/// (中心, 物料, 儲位)
type GroupKey = (String, String, String);

/// 消耗統計引擎
#[derive(Debug, Clone)]
pub struct ConsumptionEngine {
    /// 移動平均視窗（月）
    window_months: u32,
}

impl ConsumptionEngine {
    pub fn new(window_months: u32) -> Self {
        Self { window_months }
    }

    pub fn from_config(config: &ReconConfig) -> Self {
        Self::new(config.trailing_window_months)
    }

    /// 計算所有群組的消耗統計
    pub fn compute(&self, transactions: &[Transaction]) -> ConsumptionOutcome {
        tracing::info!("開始消耗統計：交易 {} 筆", transactions.len());
        let start_time = std::time::Instant::now();

        let mut groups: BTreeMap<GroupKey, Vec<&Transaction>> = BTreeMap::new();
        for tx in transactions {
            if tx.quantity > Decimal::ZERO && tx.date.is_some() {
                groups
                    .entry((tx.center.clone(), tx.material.clone(), tx.location.clone()))
                    .or_default()
                    .push(tx);
            }
        }
        tracing::debug!("消耗群組數量: {}", groups.len());

        // 視窗以全部有效交易的最新日期為基準，各群組共用
        let window_start = self.window_start(groups.values().flatten().filter_map(|tx| tx.date));
        tracing::debug!("移動平均視窗起點: {:?}", window_start);

        let groups: Vec<(GroupKey, Vec<&Transaction>)> = groups.into_iter().collect();
        let results: Vec<(&GroupKey, recon_core::Result<ConsumptionStat>)> = groups
            .par_iter()
            .map(|(key, rows)| (key, self.compute_group(key, rows, window_start)))
            .collect();

        let mut stats = Vec::with_capacity(results.len());
        let mut warnings = Vec::new();
        for (key, result) in results {
            match result {
                Ok(stat) => stats.push(stat),
                Err(e) => {
                    tracing::error!("消耗群組 {}/{}/{} 計算失敗: {}", key.0, key.1, key.2, e);
                    warnings.push(ReconWarning::error(
                        format!("{}/{}/{}", key.0, key.1, key.2),
                        e.to_string(),
                    ));
                }
            }
        }

        let anomalies = Self::validate_temporal_order(&stats);
        if anomalies > 0 {
            warnings.push(ReconWarning::warning(
                "consumption".to_string(),
                format!("{} 筆統計的前一月份晚於最近月份", anomalies),
            ));
        }

        tracing::info!(
            "消耗統計完成，統計 {} 筆，耗時 {:?}",
            stats.len(),
            start_time.elapsed()
        );

        ConsumptionOutcome {
            stats,
            anomalies,
            warnings,
        }
    }

    /// 視窗起點 = 最新日期往前 `window_months` 個月
    ///
    /// 沒有日期時為 None；往前超出日期範圍時取最小日期（全部計入）。
    fn window_start<I>(&self, dates: I) -> Option<NaiveDate>
    where
        I: Iterator<Item = NaiveDate>,
    {
        dates.max().map(|anchor| {
            anchor
                .checked_sub_months(Months::new(self.window_months))
                .unwrap_or(NaiveDate::MIN)
        })
    }

    fn compute_group(
        &self,
        key: &GroupKey,
        rows: &[&Transaction],
        window_start: Option<NaiveDate>,
    ) -> recon_core::Result<ConsumptionStat> {
        let subject = || format!("{}/{}/{}", key.0, key.1, key.2);
        let overflow = || ReconError::CalculationError(format!("消耗加總溢位: {}", subject()));

        let mut monthly: BTreeMap<MonthPeriod, Decimal> = BTreeMap::new();
        for tx in rows {
            let Some(date) = tx.date else { continue };
            let total = monthly.entry(MonthPeriod::from_date(date)).or_default();
            *total = total.checked_add(tx.quantity).ok_or_else(overflow)?;
        }

        // 由新到舊
        let mut months = monthly.iter().rev();
        let (last_period, last_qty) = months
            .next()
            .map(|(p, q)| (*p, *q))
            .ok_or_else(|| ReconError::Other(format!("消耗群組沒有資料: {}", subject())))?;
        let previous = months.next().map(|(p, q)| (*p, *q));

        let window_start = window_start.ok_or_else(|| ReconError::InvalidDate(subject()))?;

        let mut window_total = Decimal::ZERO;
        let mut window_months: BTreeSet<MonthPeriod> = BTreeSet::new();
        for tx in rows {
            let Some(date) = tx.date else { continue };
            if date >= window_start {
                window_total = window_total.checked_add(tx.quantity).ok_or_else(overflow)?;
                window_months.insert(MonthPeriod::from_date(date));
            }
        }

        let trailing_avg = if window_months.is_empty() {
            Decimal::ZERO
        } else {
            window_total
                .checked_div(Decimal::from(window_months.len()))
                .ok_or_else(overflow)?
                .round_dp(2)
        };

        Ok(ConsumptionStat {
            center: key.0.clone(),
            material: key.1.clone(),
            location: key.2.clone(),
            trailing_avg,
            last_period,
            last_qty,
            previous_period: previous.map(|(p, _)| p),
            previous_qty: previous.map(|(_, q)| q).unwrap_or(Decimal::ZERO),
        })
    }

    /// 檢查前後月份順序，回傳顛倒的筆數（只記錄不修正）
    pub fn validate_temporal_order(stats: &[ConsumptionStat]) -> usize {
        let mut anomalies = 0;
        for stat in stats.iter().filter(|s| s.is_out_of_order()) {
            anomalies += 1;
            tracing::warn!(
                "月份順序異常 {}/{}/{}: 最近={} 前一={}",
                stat.center,
                stat.material,
                stat.location,
                stat.last_period,
                stat.previous_period.map(|p| p.label()).unwrap_or_default()
            );
        }
        anomalies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tx(material: &str, date: (i32, u32, u32), qty: i64) -> Transaction {
        Transaction::new(
            "1001".to_string(),
            material.to_string(),
            "1030".to_string(),
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            Decimal::from(qty),
        )
    }

    #[test]
    fn test_last_and_previous_across_year() {
        let engine = ConsumptionEngine::new(12);
        let transactions = vec![
            tx("100", (2023, 12, 5), 10),
            tx("100", (2024, 5, 2), 20),
            tx("100", (2024, 5, 20), 5),
        ];

        let outcome = engine.compute(&transactions);
        let stat = &outcome.stats[0];

        assert_eq!(stat.last_period.label(), "05/2024");
        assert_eq!(stat.last_qty, Decimal::from(25));
        assert_eq!(stat.previous_period.map(|p| p.label()), Some("12/2023".to_string()));
        assert_eq!(stat.previous_qty, Decimal::from(10));
        assert_eq!(outcome.anomalies, 0);
    }

    #[test]
    fn test_trailing_average_window() {
        let engine = ConsumptionEngine::new(12);
        let transactions = vec![
            // 早於 2023-06-20，不計入平均
            tx("100", (2023, 6, 19), 1000),
            tx("100", (2023, 6, 20), 30),
            tx("100", (2024, 1, 1), 30),
            tx("100", (2024, 6, 20), 40),
        ];

        let outcome = engine.compute(&transactions);

        // 100 / 3 個月
        assert_eq!(outcome.stats[0].trailing_avg, Decimal::new(3333, 2));
    }

    #[test]
    fn test_window_anchored_at_latest_overall_date() {
        let engine = ConsumptionEngine::new(12);
        let transactions = vec![
            tx("100", (2021, 1, 15), 10),
            tx("200", (2024, 5, 10), 8),
            tx("200", (2024, 6, 10), 4),
        ];

        let outcome = engine.compute(&transactions);
        let stale = outcome.stats.iter().find(|s| s.material == "100").unwrap();
        let current = outcome.stats.iter().find(|s| s.material == "200").unwrap();

        // 2021-01 早於 2023-06-10，不在視窗內
        assert_eq!(stale.trailing_avg, Decimal::ZERO);
        assert_eq!(stale.last_period.label(), "01/2021");
        assert_eq!(stale.last_qty, Decimal::from(10));
        assert_eq!(current.trailing_avg, Decimal::from(6));
    }

    #[test]
    fn test_window_anchor_ignores_invalid_rows() {
        let engine = ConsumptionEngine::new(12);
        // 數量為 0 的交易不決定視窗基準
        let transactions = vec![tx("100", (2021, 1, 15), 10), tx("200", (2024, 6, 10), 0)];

        let outcome = engine.compute(&transactions);

        assert_eq!(outcome.stats.len(), 1);
        assert_eq!(outcome.stats[0].trailing_avg, Decimal::from(10));
    }

    #[test]
    fn test_single_month_group() {
        let engine = ConsumptionEngine::new(12);
        let outcome = engine.compute(&[tx("100", (2024, 3, 1), 7)]);
        let stat = &outcome.stats[0];

        assert!(stat.previous_period.is_none());
        assert_eq!(stat.previous_qty, Decimal::ZERO);
        assert_eq!(stat.trailing_avg, Decimal::from(7));
    }

    #[test]
    fn test_invalid_rows_filtered() {
        let engine = ConsumptionEngine::new(12);
        let mut undated = tx("100", (2024, 3, 1), 7);
        undated.date = None;
        let transactions = vec![undated, tx("100", (2024, 3, 1), 0), tx("200", (2024, 3, 1), -5)];

        let outcome = engine.compute(&transactions);

        assert!(outcome.stats.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_stats_sorted_by_key() {
        let engine = ConsumptionEngine::new(12);
        let transactions = vec![tx("300", (2024, 3, 1), 1), tx("100", (2024, 3, 1), 1)];

        let outcome = engine.compute(&transactions);
        let materials: Vec<&str> = outcome.stats.iter().map(|s| s.material.as_str()).collect();

        assert_eq!(materials, vec!["100", "300"]);
    }

    #[test]
    fn test_overflow_group_becomes_warning() {
        let engine = ConsumptionEngine::new(12);
        let mut big = tx("100", (2024, 3, 1), 1);
        big.quantity = Decimal::MAX;
        let transactions = vec![big.clone(), big, tx("200", (2024, 3, 1), 4)];

        let outcome = engine.compute(&transactions);

        assert_eq!(outcome.stats.len(), 1);
        assert_eq!(outcome.stats[0].material, "200");
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_validate_temporal_order_counts() {
        let mut stat = ConsumptionStat {
            center: "1001".to_string(),
            material: "100".to_string(),
            location: "1030".to_string(),
            trailing_avg: Decimal::ZERO,
            last_period: MonthPeriod::new(2024, 1).unwrap(),
            last_qty: Decimal::ONE,
            previous_period: Some(MonthPeriod::new(2023, 12).unwrap()),
            previous_qty: Decimal::ONE,
        };
        let ordered = stat.clone();
        stat.previous_period = Some(MonthPeriod::new(2024, 2).unwrap());

        assert_eq!(ConsumptionEngine::validate_temporal_order(&[ordered, stat]), 1);
    }

    proptest! {
        #[test]
        fn prop_previous_before_last(
            entries in prop::collection::vec(
                (2015i32..2030, 1u32..=12, 1u32..=28, 1i64..500),
                1..40,
            )
        ) {
            let transactions: Vec<Transaction> = entries
                .iter()
                .map(|(y, m, d, q)| tx("100", (*y, *m, *d), *q))
                .collect();

            let outcome = ConsumptionEngine::new(12).compute(&transactions);
            prop_assert_eq!(outcome.stats.len(), 1);
            prop_assert_eq!(outcome.anomalies, 0);

            let stat = &outcome.stats[0];
            if let Some(previous) = stat.previous_period {
                prop_assert!(previous < stat.last_period);
            }
            prop_assert!(stat.trailing_avg > Decimal::ZERO);
        }
    }
}

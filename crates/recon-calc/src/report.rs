//! 客戶消耗報表（下單方 / 收貨方 / 物料）

use chrono::NaiveDate;
use rayon::prelude::*;
use recon_core::{ConsumptionReportRow, MonthPeriod, ReconError, Transaction};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::{ReconWarning, ReportOutcome};

/// (下單方, 收貨方, 物料)
type ReportKey = (String, String, String);

/// 收貨方最近一筆交易
#[derive(Debug, Clone)]
struct RecipientLatest {
    date: NaiveDate,
    center: String,
}

/// 月份合計
#[derive(Debug, Clone, Copy, Default)]
struct MonthTotals {
    qty: Decimal,
    amount: Decimal,
}

impl MonthTotals {
    fn unit_price(&self) -> Decimal {
        if self.qty > Decimal::ZERO {
            self.amount
                .checked_div(self.qty)
                .map(|p| p.round_dp(2))
                .unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        }
    }
}

/// 客戶消耗報表
pub struct ConsumptionReport;

impl ConsumptionReport {
    /// 產生報表
    ///
    /// `as_of` 所在月份為本月，歷史統計只看本月之前的月份。
    pub fn generate(transactions: &[Transaction], as_of: NaiveDate) -> ReportOutcome {
        tracing::info!("開始產生消耗報表：交易 {} 筆，基準日 {}", transactions.len(), as_of);
        let start_time = std::time::Instant::now();

        let valid = Self::clean(transactions);
        let current = MonthPeriod::from_date(as_of);

        let mut latest_by_recipient: HashMap<&str, RecipientLatest> = HashMap::new();
        let mut groups: BTreeMap<ReportKey, Vec<&Transaction>> = BTreeMap::new();
        for tx in valid.iter().copied() {
            let Some(date) = tx.date else { continue };

            let newer = latest_by_recipient
                .get(tx.recipient_id.as_str())
                .map_or(true, |latest| date > latest.date);
            if newer {
                latest_by_recipient.insert(
                    tx.recipient_id.as_str(),
                    RecipientLatest {
                        date,
                        center: tx.center.clone(),
                    },
                );
            }

            groups
                .entry((
                    tx.requester_id.clone(),
                    tx.recipient_id.clone(),
                    tx.material.clone(),
                ))
                .or_default()
                .push(tx);
        }

        let groups: Vec<(ReportKey, Vec<&Transaction>)> = groups.into_iter().collect();
        let results: Vec<(&ReportKey, recon_core::Result<ConsumptionReportRow>)> = groups
            .par_iter()
            .map(|(key, rows)| {
                let latest = latest_by_recipient.get(key.1.as_str());
                (key, Self::build_row(rows, current, latest))
            })
            .collect();

        let mut outcome = ReportOutcome {
            rows: Vec::with_capacity(results.len()),
            warnings: Vec::new(),
        };
        for (key, result) in results {
            match result {
                Ok(row) => outcome.rows.push(row),
                Err(e) => {
                    tracing::error!("消耗報表群組 {}/{}/{} 計算失敗: {}", key.0, key.1, key.2, e);
                    outcome.warnings.push(ReconWarning::error(
                        format!("{}/{}/{}", key.0, key.1, key.2),
                        e.to_string(),
                    ));
                }
            }
        }

        tracing::info!(
            "消耗報表完成，報表列 {} 筆，耗時 {:?}",
            outcome.rows.len(),
            start_time.elapsed()
        );

        outcome
    }

    /// 去除完全相同的交易，只留數量、金額為正且有日期的列
    fn clean(transactions: &[Transaction]) -> Vec<&Transaction> {
        let mut seen: HashSet<&Transaction> = HashSet::new();
        let before = transactions.len();

        let valid: Vec<&Transaction> = transactions
            .iter()
            .filter(|tx| seen.insert(*tx))
            .filter(|tx| {
                tx.quantity > Decimal::ZERO && tx.amount > Decimal::ZERO && tx.date.is_some()
            })
            .collect();

        tracing::debug!("消耗報表有效交易 {} / {}", valid.len(), before);
        valid
    }

    fn build_row(
        rows: &[&Transaction],
        current: MonthPeriod,
        latest: Option<&RecipientLatest>,
    ) -> recon_core::Result<ConsumptionReportRow> {
        let overflow = || ReconError::CalculationError("消耗報表加總溢位".to_string());
        let add = |total: Decimal, qty: Decimal| total.checked_add(qty).ok_or_else(overflow);

        // 最近一筆（同日取輸入順序較前者）
        let newest = rows
            .iter()
            .copied()
            .reduce(|best, tx| if tx.date > best.date { tx } else { best })
            .ok_or_else(|| ReconError::Other("消耗報表群組沒有資料".to_string()))?;

        let mut hist_total = Decimal::ZERO;
        let mut hist_count = 0usize;
        let mut hist_months: BTreeSet<MonthPeriod> = BTreeSet::new();
        let mut hist_min: Option<MonthPeriod> = None;
        let mut hist_max: Option<MonthPeriod> = None;
        let mut current_total = Decimal::ZERO;
        let mut monthly: BTreeMap<MonthPeriod, MonthTotals> = BTreeMap::new();
        let mut prices: Vec<Decimal> = Vec::new();

        for tx in rows {
            let Some(period) = tx.period() else { continue };

            if period < current {
                hist_total = add(hist_total, tx.quantity)?;
                hist_count += 1;
                hist_months.insert(period);
                hist_min = Some(hist_min.map_or(period, |m| m.min(period)));
                hist_max = Some(hist_max.map_or(period, |m| m.max(period)));
            } else if period == current {
                current_total = add(current_total, tx.quantity)?;
            }

            let month = monthly.entry(period).or_default();
            month.qty = add(month.qty, tx.quantity)?;
            month.amount = add(month.amount, tx.amount)?;

            let price = tx.unit_price();
            if price > Decimal::ZERO {
                prices.push(price);
            }
        }

        let (avg_monthly, trend, quantity_trend) = match (hist_min, hist_max) {
            (Some(min), Some(max)) if hist_count > 0 => {
                let span = Decimal::from(max.months_since(&min).max(1));
                let avg = hist_total.checked_div(span).ok_or_else(overflow)?.trunc();
                let trend = span
                    .checked_div(Decimal::from(hist_months.len()))
                    .ok_or_else(overflow)?
                    .round_dp(2);
                let qty_trend = hist_total
                    .checked_div(Decimal::from(hist_count))
                    .ok_or_else(overflow)?
                    .round_dp(2);
                (avg, trend, qty_trend)
            }
            _ => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        };

        let mut months = monthly.iter().rev();
        let last = months.next().map(|(p, t)| (*p, *t));
        let previous = months.next().map(|(p, t)| (*p, *t));

        let (price_min, price_max, price_avg) = if prices.is_empty() {
            (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
        } else {
            let mut sum = Decimal::ZERO;
            for price in &prices {
                sum = add(sum, *price)?;
            }
            let avg = sum
                .checked_div(Decimal::from(prices.len()))
                .ok_or_else(overflow)?;
            let min = prices.iter().copied().min().unwrap_or(Decimal::ZERO);
            let max = prices.iter().copied().max().unwrap_or(Decimal::ZERO);
            (min.round_dp(2), max.round_dp(2), avg.round_dp(2))
        };

        Ok(ConsumptionReportRow {
            center: latest.map(|l| l.center.clone()).unwrap_or_default(),
            client_group: newest.client_group.clone(),
            seller_group: newest.seller_group.clone(),
            requester_id: newest.requester_id.clone(),
            recipient_id: newest.recipient_id.clone(),
            legal_name: newest.legal_name.clone(),
            material: newest.material.clone(),
            description: newest.description.clone(),
            recipient_last_invoice: latest
                .map(|l| MonthPeriod::from_date(l.date).label())
                .unwrap_or_default(),
            avg_monthly_consumption: avg_monthly,
            current_consumption: current_total,
            unit: newest.unit.clone(),
            trend,
            quantity_trend,
            last_period: last.map(|(p, _)| p),
            last_qty: last.map(|(_, t)| t.qty).unwrap_or_default(),
            last_amount: last.map(|(_, t)| t.amount).unwrap_or_default(),
            last_unit_price: last.map(|(_, t)| t.unit_price()).unwrap_or_default(),
            previous_period: previous.map(|(p, _)| p),
            previous_qty: previous.map(|(_, t)| t.qty).unwrap_or_default(),
            previous_amount: previous.map(|(_, t)| t.amount).unwrap_or_default(),
            previous_unit_price: previous.map(|(_, t)| t.unit_price()).unwrap_or_default(),
            price_min,
            price_max,
            price_avg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(recipient: &str, center: &str, on: NaiveDate, qty: i64, amount: i64) -> Transaction {
        Transaction::new(
            center.to_string(),
            "100".to_string(),
            "1030".to_string(),
            on,
            Decimal::from(qty),
        )
        .with_customer("C1".to_string(), recipient.to_string())
        .with_amount(Decimal::from(amount))
        .with_invoice(format!("F-{}-{}", on, qty))
    }

    #[test]
    fn test_history_excludes_current_month() {
        let transactions = vec![
            invoice("R1", "1001", date(2024, 1, 10), 10, 100),
            invoice("R1", "1001", date(2024, 3, 10), 20, 220),
            invoice("R1", "1001", date(2024, 4, 10), 30, 300),
            // 本月
            invoice("R1", "1003", date(2024, 6, 2), 5, 60),
        ];

        let outcome = ConsumptionReport::generate(&transactions, date(2024, 6, 15));
        let row = &outcome.rows[0];

        // 60 / 3 個月跨度
        assert_eq!(row.avg_monthly_consumption, Decimal::from(20));
        assert_eq!(row.current_consumption, Decimal::from(5));
        // 跨度 3 / 有發票月份 3
        assert_eq!(row.trend, Decimal::ONE);
        // 60 / 3 筆
        assert_eq!(row.quantity_trend, Decimal::from(20));
        assert_eq!(row.center, "1003");
        assert_eq!(row.recipient_last_invoice, "06/2024");
    }

    #[test]
    fn test_last_and_previous_months() {
        let transactions = vec![
            invoice("R1", "1001", date(2024, 3, 10), 20, 220),
            invoice("R1", "1001", date(2024, 4, 10), 30, 300),
            invoice("R1", "1001", date(2024, 4, 20), 10, 100),
        ];

        let outcome = ConsumptionReport::generate(&transactions, date(2024, 6, 15));
        let row = &outcome.rows[0];

        assert_eq!(row.last_period.map(|p| p.label()), Some("04/2024".to_string()));
        assert_eq!(row.last_qty, Decimal::from(40));
        assert_eq!(row.last_amount, Decimal::from(400));
        assert_eq!(row.last_unit_price, Decimal::from(10));
        assert_eq!(row.previous_period.map(|p| p.label()), Some("03/2024".to_string()));
        assert_eq!(row.previous_unit_price, Decimal::from(11));
        assert_eq!(row.price_min, Decimal::from(10));
        assert_eq!(row.price_max, Decimal::from(11));
        assert_eq!(row.price_avg, Decimal::new(1033, 2));
    }

    #[test]
    fn test_single_historical_month_span_is_one() {
        let transactions = vec![
            invoice("R1", "1001", date(2024, 2, 1), 7, 70),
            invoice("R1", "1001", date(2024, 2, 9), 8, 80),
        ];

        let outcome = ConsumptionReport::generate(&transactions, date(2024, 6, 15));
        let row = &outcome.rows[0];

        assert_eq!(row.avg_monthly_consumption, Decimal::from(15));
        assert_eq!(row.trend, Decimal::ONE);
        assert_eq!(row.quantity_trend, Decimal::new(75, 1));
        assert!(row.previous_period.is_none());
    }

    #[test]
    fn test_only_current_month_has_zero_history() {
        let transactions = vec![invoice("R1", "1001", date(2024, 6, 1), 7, 70)];

        let outcome = ConsumptionReport::generate(&transactions, date(2024, 6, 15));
        let row = &outcome.rows[0];

        assert_eq!(row.avg_monthly_consumption, Decimal::ZERO);
        assert_eq!(row.trend, Decimal::ZERO);
        assert_eq!(row.current_consumption, Decimal::from(7));
    }

    #[test]
    fn test_duplicates_and_invalid_rows_dropped() {
        let tx = invoice("R1", "1001", date(2024, 3, 10), 20, 200);
        let free_sample = invoice("R1", "1001", date(2024, 3, 11), 5, 0);
        let transactions = vec![tx.clone(), tx, free_sample];

        let outcome = ConsumptionReport::generate(&transactions, date(2024, 6, 15));
        let row = &outcome.rows[0];

        assert_eq!(row.last_qty, Decimal::from(20));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_one_row_per_group_sorted() {
        let transactions = vec![
            invoice("R2", "1001", date(2024, 3, 10), 1, 1),
            invoice("R1", "1001", date(2024, 3, 10), 1, 1),
            invoice("R1", "1001", date(2024, 4, 10), 1, 1),
        ];

        let outcome = ConsumptionReport::generate(&transactions, date(2024, 6, 15));
        let recipients: Vec<&str> = outcome.rows.iter().map(|r| r.recipient_id.as_str()).collect();

        assert_eq!(recipients, vec!["R1", "R2"]);
    }

    #[test]
    fn test_empty_input() {
        let outcome = ConsumptionReport::generate(&[], date(2024, 6, 15));
        assert!(outcome.rows.is_empty());
    }
}

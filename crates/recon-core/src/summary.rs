//! 對帳彙總模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::consumption::ConsumptionStat;
use crate::inventory::QtyBreakdown;
use crate::period::MonthPeriod;

/// 彙總鍵，排序為 (中心, 儲位, 物料)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SummaryKey {
    pub center: String,
    pub location: String,
    pub material: String,
}

impl SummaryKey {
    pub fn new(center: &str, location: &str, material: &str) -> Self {
        Self {
            center: center.to_string(),
            location: location.to_string(),
            material: material.to_string(),
        }
    }
}

/// 彙總列的來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryOrigin {
    /// 來自庫存
    Inventory,
    /// 只來自未結需求
    Demand,
}

impl SummaryOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            SummaryOrigin::Inventory => "Inventory",
            SummaryOrigin::Demand => "Demand",
        }
    }
}

/// 對帳彙總的一列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub key: SummaryKey,
    pub description: String,

    /// 不同訂單數
    pub order_count: usize,

    /// 未結數量合計
    pub pending_qty: Decimal,

    /// 未結金額合計（數量 × 單價）
    pub pending_amount: Decimal,

    pub trailing_avg: Decimal,
    pub last_period: Option<MonthPeriod>,
    pub last_qty: Decimal,
    pub previous_period: Option<MonthPeriod>,
    pub previous_qty: Decimal,

    /// 涵蓋月數
    pub coverage_months: Decimal,

    /// 各主要儲位庫存
    pub stock_by_location: QtyBreakdown,

    /// 本列儲位的在途（非主要儲位為 0）
    pub transit_at_location: Decimal,

    /// 調撥中心各儲位庫存
    pub redistribution_stock: QtyBreakdown,

    /// 各主要中心未結（只有本列中心有值）
    pub pending_by_center: QtyBreakdown,

    pub origin: SummaryOrigin,
}

impl SummaryRow {
    /// 以鍵建立空白列
    pub fn empty(key: SummaryKey, origin: SummaryOrigin) -> Self {
        Self {
            key,
            description: String::new(),
            order_count: 0,
            pending_qty: Decimal::ZERO,
            pending_amount: Decimal::ZERO,
            trailing_avg: Decimal::ZERO,
            last_period: None,
            last_qty: Decimal::ZERO,
            previous_period: None,
            previous_qty: Decimal::ZERO,
            coverage_months: Decimal::ZERO,
            stock_by_location: QtyBreakdown::default(),
            transit_at_location: Decimal::ZERO,
            redistribution_stock: QtyBreakdown::default(),
            pending_by_center: QtyBreakdown::default(),
            origin,
        }
    }

    /// 套用消耗統計（左連接：沒有統計則維持 0）
    pub fn apply_stat(&mut self, stat: &ConsumptionStat) {
        self.trailing_avg = stat.trailing_avg;
        self.last_period = Some(stat.last_period);
        self.last_qty = stat.last_qty;
        self.previous_period = stat.previous_period;
        self.previous_qty = stat.previous_qty;
    }
}

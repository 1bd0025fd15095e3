//! 庫存模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::normalize::normalize_ids;

/// 一筆庫存紀錄（中心 / 物料 / 儲位）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryRecord {
    /// 中心
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub center: String,

    /// 物料ID
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub material: String,

    /// 儲位
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub location: String,

    /// 物料描述
    pub description: String,

    /// 帳面可用庫存（未扣除客戶保留）
    #[serde(deserialize_with = "crate::normalize::lenient::quantity")]
    pub free_stock: Decimal,

    /// 已承諾給客戶的數量
    #[serde(deserialize_with = "crate::normalize::lenient::quantity")]
    pub committed_qty: Decimal,

    /// 在途數量
    #[serde(deserialize_with = "crate::normalize::lenient::quantity")]
    pub in_transit_qty: Decimal,
}

impl InventoryRecord {
    /// 創建新的庫存紀錄
    pub fn new(center: String, material: String, location: String, free_stock: Decimal) -> Self {
        Self {
            center,
            material,
            location,
            free_stock,
            ..Default::default()
        }
    }

    /// 建構器模式：設置承諾數量
    pub fn with_committed(mut self, qty: Decimal) -> Self {
        self.committed_qty = qty;
        self
    }

    /// 建構器模式：設置在途數量
    pub fn with_in_transit(mut self, qty: Decimal) -> Self {
        self.in_transit_qty = qty;
        self
    }

    /// 建構器模式：設置描述
    pub fn with_description(mut self, description: String) -> Self {
        self.description = description;
        self
    }

    /// 可用數量 = max(帳面 - 承諾, 0)，溢位時為 None
    pub fn available_qty(&self) -> Option<Decimal> {
        self.free_stock
            .checked_sub(self.committed_qty)
            .map(|qty| qty.max(Decimal::ZERO))
    }

    /// 正規化識別碼欄位
    pub fn normalized(mut self) -> Self {
        normalize_ids(&mut [&mut self.center, &mut self.material, &mut self.location]);
        self
    }
}

/// 依配置順序排列的數量分項
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QtyBreakdown {
    /// (鍵, 數量)
    pub entries: Vec<(String, Decimal)>,
}

impl QtyBreakdown {
    /// 依鍵順序建立，數量由 `f` 提供
    pub fn from_keys<F>(keys: &[String], mut f: F) -> Self
    where
        F: FnMut(&str) -> Decimal,
    {
        Self {
            entries: keys.iter().map(|k| (k.clone(), f(k))).collect(),
        }
    }

    /// 取得某鍵的數量，不存在時為 0
    pub fn get(&self, key: &str) -> Decimal {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, qty)| *qty)
            .unwrap_or(Decimal::ZERO)
    }

    /// 總和，溢位時為 None
    pub fn checked_total(&self) -> Option<Decimal> {
        self.entries
            .iter()
            .try_fold(Decimal::ZERO, |acc, (_, qty)| acc.checked_add(*qty))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 一條建議的庫存快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    /// 中心
    pub center: String,

    /// 各主要儲位庫存
    pub stock_by_location: QtyBreakdown,

    /// 各主要儲位在途
    pub transit_by_location: QtyBreakdown,

    /// 主要儲位在途合計（溢位時為 None）
    pub transit_total: Option<Decimal>,

    /// 調撥中心各儲位庫存
    pub redistribution_stock: QtyBreakdown,

    /// 各主要中心的調撥儲位庫存
    pub bulk_by_center: QtyBreakdown,
}

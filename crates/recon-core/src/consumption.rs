//! 消耗（發票交易）模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::normalize::normalize_ids;
use crate::period::MonthPeriod;

/// 一筆歷史發票交易
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Transaction {
    /// 下單方
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub requester_id: String,

    /// 收貨方
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub recipient_id: String,

    /// 客戶名稱
    pub legal_name: String,

    /// 發票日期
    #[serde(deserialize_with = "crate::normalize::lenient::date")]
    pub date: Option<NaiveDate>,

    /// 發票號
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub invoice_id: String,

    /// 物料ID
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub material: String,

    /// 物料描述
    pub description: String,

    /// 數量
    #[serde(deserialize_with = "crate::normalize::lenient::quantity")]
    pub quantity: Decimal,

    /// 單位
    pub unit: String,

    /// 金額
    #[serde(deserialize_with = "crate::normalize::lenient::quantity")]
    pub amount: Decimal,

    /// 中心
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub center: String,

    /// 儲位
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub location: String,

    /// 訂單文件號
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub order_doc_id: String,

    /// 業務群組
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub seller_group: String,

    /// 客戶群組
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub client_group: String,
}

impl Transaction {
    /// 創建新的交易
    pub fn new(
        center: String,
        material: String,
        location: String,
        date: NaiveDate,
        quantity: Decimal,
    ) -> Self {
        Self {
            center,
            material,
            location,
            date: Some(date),
            quantity,
            ..Default::default()
        }
    }

    /// 建構器模式：設置客戶
    pub fn with_customer(mut self, requester_id: String, recipient_id: String) -> Self {
        self.requester_id = requester_id;
        self.recipient_id = recipient_id;
        self
    }

    /// 建構器模式：設置金額
    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }

    /// 建構器模式：設置發票號
    pub fn with_invoice(mut self, invoice_id: String) -> Self {
        self.invoice_id = invoice_id;
        self
    }

    /// 建構器模式：設置描述與單位
    pub fn with_description(mut self, description: String, unit: String) -> Self {
        self.description = description;
        self.unit = unit;
        self
    }

    /// 交易所屬月份
    pub fn period(&self) -> Option<MonthPeriod> {
        self.date.map(MonthPeriod::from_date)
    }

    /// 單價（數量為 0 時為 0）
    pub fn unit_price(&self) -> Decimal {
        if self.quantity.is_zero() {
            Decimal::ZERO
        } else {
            self.amount.checked_div(self.quantity).unwrap_or(Decimal::ZERO)
        }
    }

    /// 正規化識別碼欄位
    pub fn normalized(mut self) -> Self {
        normalize_ids(&mut [
            &mut self.requester_id,
            &mut self.recipient_id,
            &mut self.invoice_id,
            &mut self.material,
            &mut self.center,
            &mut self.location,
            &mut self.order_doc_id,
            &mut self.seller_group,
            &mut self.client_group,
        ]);
        self
    }
}

/// 中心 / 物料 / 儲位的消耗統計
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionStat {
    pub center: String,
    pub material: String,
    pub location: String,

    /// 移動平均（兩位小數）
    pub trailing_avg: Decimal,

    /// 最近月份
    pub last_period: MonthPeriod,

    /// 最近月份數量
    pub last_qty: Decimal,

    /// 前一個不同月份
    pub previous_period: Option<MonthPeriod>,

    /// 前一個月份數量
    pub previous_qty: Decimal,
}

impl ConsumptionStat {
    /// 前後月份是否顛倒
    pub fn is_out_of_order(&self) -> bool {
        self.previous_period
            .map(|previous| previous > self.last_period)
            .unwrap_or(false)
    }
}

/// 客戶消耗報表的一列（下單方 / 收貨方 / 物料）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionReportRow {
    /// 收貨方最近一筆交易的中心
    pub center: String,
    pub client_group: String,
    pub seller_group: String,
    pub requester_id: String,
    pub recipient_id: String,
    pub legal_name: String,
    pub material: String,
    pub description: String,

    /// 收貨方最後發票月份 MM/YYYY
    pub recipient_last_invoice: String,

    /// 歷史月平均（取整）
    pub avg_monthly_consumption: Decimal,

    /// 本月消耗
    pub current_consumption: Decimal,

    pub unit: String,

    /// 月份跨度 / 有發票的月份數
    pub trend: Decimal,

    /// 歷史總量 / 發票筆數
    pub quantity_trend: Decimal,

    pub last_period: Option<MonthPeriod>,
    pub last_qty: Decimal,
    pub last_amount: Decimal,
    pub last_unit_price: Decimal,

    pub previous_period: Option<MonthPeriod>,
    pub previous_qty: Decimal,
    pub previous_amount: Decimal,
    pub previous_unit_price: Decimal,

    pub price_min: Decimal,
    pub price_max: Decimal,
    pub price_avg: Decimal,
}

//! 需求模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::normalize::{is_blank, normalize_ids};

/// 凍結狀態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockStatus {
    /// 未凍結
    #[default]
    Clear,
    /// 信用凍結
    Credit,
    /// 交貨凍結
    Stopped,
    /// 兩者皆有
    StoppedAndCredit,
}

impl BlockStatus {
    /// 輸出用標籤（未凍結為空字串）
    pub fn label(&self) -> &'static str {
        match self {
            BlockStatus::Clear => "",
            BlockStatus::Credit => "Credit",
            BlockStatus::Stopped => "Stopped",
            BlockStatus::StoppedAndCredit => "Stopped+Credit",
        }
    }

    /// 是否未凍結
    pub fn is_clear(&self) -> bool {
        *self == BlockStatus::Clear
    }
}

/// 未結需求行（一張訂單的一個物料）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandLine {
    /// 客戶群組
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub client_group: String,

    /// 訂單日期
    #[serde(deserialize_with = "crate::normalize::lenient::date")]
    pub date: Option<NaiveDate>,

    /// 訂單號
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub order_id: String,

    /// 業務群組
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub seller_group: String,

    /// 下單方
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub requester_id: String,

    /// 收貨方
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub recipient_id: String,

    /// 客戶名稱
    pub legal_name: String,

    /// 中心
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub center: String,

    /// 儲位
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub location: String,

    /// 需求物料
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub material: String,

    /// 基礎物料
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub base_material: String,

    /// 物料描述
    pub description: String,

    /// 訂購數量
    #[serde(deserialize_with = "crate::normalize::lenient::quantity")]
    pub ordered_qty: Decimal,

    /// 未結數量
    #[serde(deserialize_with = "crate::normalize::lenient::quantity")]
    pub pending_qty: Decimal,

    /// 單價
    #[serde(deserialize_with = "crate::normalize::lenient::quantity")]
    pub unit_price: Decimal,

    /// 信用狀態代碼
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub credit_status: String,

    /// 交貨凍結代碼
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub delivery_block: String,
}

impl DemandLine {
    /// 創建新的需求行
    pub fn new(
        order_id: String,
        center: String,
        location: String,
        material: String,
        pending_qty: Decimal,
    ) -> Self {
        Self {
            order_id,
            center,
            location,
            base_material: material.clone(),
            material,
            ordered_qty: pending_qty,
            pending_qty,
            ..Default::default()
        }
    }

    /// 建構器模式：設置客戶資訊
    pub fn with_customer(
        mut self,
        requester_id: String,
        recipient_id: String,
        legal_name: String,
    ) -> Self {
        self.requester_id = requester_id;
        self.recipient_id = recipient_id;
        self.legal_name = legal_name;
        self
    }

    /// 建構器模式：設置群組
    pub fn with_groups(mut self, client_group: String, seller_group: String) -> Self {
        self.client_group = client_group;
        self.seller_group = seller_group;
        self
    }

    /// 建構器模式：設置訂單日期
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// 建構器模式：設置描述
    pub fn with_description(mut self, description: String) -> Self {
        self.description = description;
        self
    }

    /// 建構器模式：設置訂購數量
    pub fn with_ordered_qty(mut self, qty: Decimal) -> Self {
        self.ordered_qty = qty;
        self
    }

    /// 建構器模式：設置單價
    pub fn with_unit_price(mut self, price: Decimal) -> Self {
        self.unit_price = price;
        self
    }

    /// 建構器模式：設置信用狀態
    pub fn with_credit_status(mut self, code: String) -> Self {
        self.credit_status = code;
        self
    }

    /// 建構器模式：設置交貨凍結
    pub fn with_delivery_block(mut self, code: String) -> Self {
        self.delivery_block = code;
        self
    }

    /// 計算凍結狀態
    pub fn block_status(&self, credit_block_code: &str) -> BlockStatus {
        let credit =
            !credit_block_code.is_empty() && self.credit_status.trim() == credit_block_code;
        let stopped = !is_blank(&self.delivery_block);

        match (stopped, credit) {
            (true, true) => BlockStatus::StoppedAndCredit,
            (true, false) => BlockStatus::Stopped,
            (false, true) => BlockStatus::Credit,
            (false, false) => BlockStatus::Clear,
        }
    }

    /// 可提供數量 = min(未結, 可用)；未結不大於 0 時為 0
    pub fn offerable(&self, available: Decimal) -> Decimal {
        if self.pending_qty > Decimal::ZERO {
            self.pending_qty.min(available).max(Decimal::ZERO)
        } else {
            Decimal::ZERO
        }
    }

    /// 是否有需求物料
    pub fn has_material(&self) -> bool {
        !self.material.trim().is_empty()
    }

    /// 正規化識別碼欄位
    pub fn normalized(mut self) -> Self {
        normalize_ids(&mut [
            &mut self.client_group,
            &mut self.order_id,
            &mut self.seller_group,
            &mut self.requester_id,
            &mut self.recipient_id,
            &mut self.center,
            &mut self.location,
            &mut self.material,
            &mut self.base_material,
        ]);
        self
    }
}

//! 供應來源模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::normalize::normalize_ids;

/// 供應來源類型
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    /// 短效期批次（數量只存在於此來源的批次列）
    NearExpiry,
    /// 慢動料（候選清單，本身不帶數量）
    SlowMoving,
    /// 替代料對照（候選清單，本身不帶數量）
    Substitute,
    /// 不合格品
    Pnc,
    /// 已過期
    Expired,
    /// 其他可配置庫存池
    Pool(String),
}

impl SourceKind {
    /// 輸出用標籤
    pub fn label(&self) -> &str {
        match self {
            SourceKind::NearExpiry => "NearExpiry",
            SourceKind::SlowMoving => "SlowMoving",
            SourceKind::Substitute => "Substitute",
            SourceKind::Pnc => "PNC",
            SourceKind::Expired => "Expired",
            SourceKind::Pool(name) => name,
        }
    }

    /// 解析來源名稱（接受輸出標籤與工作表原始名稱）
    ///
    /// 其他庫存池必須已在 `pools` 宣告，未知名稱回傳錯誤而不是默默略過。
    pub fn parse(name: &str, pools: &[String]) -> crate::Result<Self> {
        let trimmed = name.trim();
        let kind = match trimmed {
            "NearExpiry" | "Corta caducidad" => SourceKind::NearExpiry,
            "SlowMoving" | "Lento mov" => SourceKind::SlowMoving,
            "Substitute" | "Sustituto" => SourceKind::Substitute,
            "PNC" => SourceKind::Pnc,
            "Expired" | "Caduco" => SourceKind::Expired,
            other if pools.iter().any(|p| p == other) => SourceKind::Pool(other.to_string()),
            other => return Err(crate::ReconError::UnknownSource(other.to_string())),
        };
        Ok(kind)
    }

    /// 是否為候選清單型來源（數量取自調撥儲位庫存）
    pub fn is_candidate_list(&self) -> bool {
        matches!(self, SourceKind::SlowMoving | SourceKind::Substitute)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 供應來源中的一列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplyRow {
    /// 物料ID
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub material: String,

    /// 中心
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub center: String,

    /// 儲位
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub location: String,

    /// 可用數量
    #[serde(deserialize_with = "crate::normalize::lenient::quantity")]
    pub available_qty: Decimal,

    /// 批次
    pub lot: Option<String>,

    /// 到期日（原始文字，日先格式）
    pub expiry: Option<String>,

    /// 物料描述
    pub description: String,
}

impl SupplyRow {
    /// 創建新的供應列
    pub fn new(
        material: String,
        center: String,
        location: String,
        available_qty: Decimal,
    ) -> Self {
        Self {
            material,
            center,
            location,
            available_qty,
            lot: None,
            expiry: None,
            description: String::new(),
        }
    }

    /// 只有物料的候選列（慢動料清單）
    pub fn candidate(material: String) -> Self {
        Self::new(material, String::new(), String::new(), Decimal::ZERO)
    }

    /// 建構器模式：設置批次
    pub fn with_lot(mut self, lot: String) -> Self {
        self.lot = Some(lot);
        self
    }

    /// 建構器模式：設置到期日
    pub fn with_expiry(mut self, expiry: String) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// 建構器模式：設置描述
    pub fn with_description(mut self, description: String) -> Self {
        self.description = description;
        self
    }

    /// 批次（空字串視為無批次）
    pub fn lot_str(&self) -> &str {
        self.lot.as_deref().map(str::trim).unwrap_or("")
    }

    /// 正規化識別碼欄位
    pub fn normalized(mut self) -> Self {
        normalize_ids(&mut [&mut self.material, &mut self.center, &mut self.location]);
        self
    }
}

/// 具名供應池
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyPool {
    /// 來源類型
    pub kind: SourceKind,

    /// 資料列
    pub rows: Vec<SupplyRow>,
}

impl SupplyPool {
    /// 創建供應池
    pub fn new(kind: SourceKind, rows: Vec<SupplyRow>) -> Self {
        Self { kind, rows }
    }

    /// 是否沒有資料
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 正規化所有資料列
    pub fn normalized(self) -> Self {
        Self {
            kind: self.kind,
            rows: self.rows.into_iter().map(SupplyRow::normalized).collect(),
        }
    }
}

/// 替代料對照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstituteMapping {
    /// 原需求物料
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub material: String,

    /// 替代物料
    #[serde(deserialize_with = "crate::normalize::lenient::text")]
    pub substitute_material: String,

    /// 替代物料描述
    pub substitute_description: String,
}

impl SubstituteMapping {
    /// 創建替代料對照
    pub fn new(material: String, substitute_material: String) -> Self {
        Self {
            material,
            substitute_material,
            substitute_description: String::new(),
        }
    }

    /// 建構器模式：設置替代物料描述
    pub fn with_description(mut self, description: String) -> Self {
        self.substitute_description = description;
        self
    }

    /// 正規化識別碼欄位
    pub fn normalized(mut self) -> Self {
        normalize_ids(&mut [&mut self.material, &mut self.substitute_material]);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("NearExpiry", SourceKind::NearExpiry)]
    #[case("Corta caducidad", SourceKind::NearExpiry)]
    #[case("Lento mov", SourceKind::SlowMoving)]
    #[case("Sustituto", SourceKind::Substitute)]
    #[case(" PNC ", SourceKind::Pnc)]
    #[case("Caduco", SourceKind::Expired)]
    #[case("Cosmopark", SourceKind::Pool("Cosmopark".to_string()))]
    fn test_parse_source(#[case] name: &str, #[case] expected: SourceKind) {
        let pools = vec!["Cosmopark".to_string()];
        assert_eq!(SourceKind::parse(name, &pools).unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_source() {
        // 打錯字不能默默略過
        let result = SourceKind::parse("Corta cadcidad", &[]);
        assert!(matches!(result, Err(crate::ReconError::UnknownSource(_))));
    }

    #[test]
    fn test_labels() {
        assert_eq!(SourceKind::Pnc.label(), "PNC");
        assert_eq!(SourceKind::Pool("Cosmopark".to_string()).to_string(), "Cosmopark");
        assert!(SourceKind::Substitute.is_candidate_list());
        assert!(!SourceKind::NearExpiry.is_candidate_list());
    }

    #[test]
    fn test_supply_row_builder() {
        let row = SupplyRow::new(
            "200".to_string(),
            "1001".to_string(),
            "1030".to_string(),
            Decimal::from(30),
        )
        .with_lot(" L1 ".to_string())
        .with_expiry("31/12/2025".to_string());

        assert_eq!(row.lot_str(), "L1");
        assert_eq!(row.expiry.as_deref(), Some("31/12/2025"));
        assert_eq!(SupplyRow::candidate("100".to_string()).lot_str(), "");
    }

    #[test]
    fn test_pool_and_mapping_normalized() {
        let pool = SupplyPool::new(
            SourceKind::Pnc,
            vec![SupplyRow::new(
                "200.0".to_string(),
                " 1001".to_string(),
                "1030.00".to_string(),
                Decimal::from(3),
            )],
        )
        .normalized();
        let mapping = SubstituteMapping::new("100 ".to_string(), "NaN".to_string()).normalized();

        assert_eq!(pool.kind, SourceKind::Pnc);
        assert_eq!(pool.rows[0].material, "200");
        assert_eq!(pool.rows[0].center, "1001");
        assert_eq!(pool.rows[0].location, "1030");
        assert_eq!(mapping.material, "100");
        assert_eq!(mapping.substitute_material, "");
    }
}

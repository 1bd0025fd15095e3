//! 供應建議模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::demand::{BlockStatus, DemandLine};
use crate::inventory::StockSnapshot;
use crate::supply::SourceKind;

/// 建議的來源標記
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuggestionSource {
    /// 基準列（需求本身）
    Baseline,
    /// 單一來源
    Single(SourceKind),
    /// 組合來源（替代料 / 慢動料經由另一來源）
    Combined(SourceKind, SourceKind),
}

impl SuggestionSource {
    /// 輸出用標籤
    pub fn label(&self) -> String {
        match self {
            SuggestionSource::Baseline => String::new(),
            SuggestionSource::Single(kind) => kind.label().to_string(),
            SuggestionSource::Combined(primary, via) => {
                format!("{}/{}", primary.label(), via.label())
            }
        }
    }

    pub fn is_baseline(&self) -> bool {
        matches!(self, SuggestionSource::Baseline)
    }

    /// 主要來源（基準列為 None）
    pub fn primary(&self) -> Option<&SourceKind> {
        match self {
            SuggestionSource::Baseline => None,
            SuggestionSource::Single(kind) | SuggestionSource::Combined(kind, _) => Some(kind),
        }
    }

    /// 是否由替代料產生
    pub fn is_substitute_derived(&self) -> bool {
        matches!(self.primary(), Some(SourceKind::Substitute))
    }
}

/// 一條供應建議
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionLine {
    /// 原需求行
    pub demand: DemandLine,

    /// 來源
    pub source: SuggestionSource,

    /// 建議物料
    pub suggested_material: String,

    /// 建議物料描述
    pub suggested_description: String,

    /// 建議中心
    pub suggested_center: String,

    /// 建議儲位
    pub suggested_location: String,

    /// 來源可用數量
    pub available_qty: Decimal,

    /// 批次
    pub lot: String,

    /// 到期日 dd/mm/yyyy（無法解析為空）
    pub expiry: String,

    /// 可提供數量
    pub offerable_qty: Decimal,

    /// 庫存快照
    pub snapshot: StockSnapshot,

    /// 凍結狀態
    pub block_status: BlockStatus,
}

impl SuggestionLine {
    /// 基準列：沒有建議來源，只帶需求本身
    pub fn baseline(
        demand: DemandLine,
        snapshot: StockSnapshot,
        block_status: BlockStatus,
    ) -> Self {
        Self {
            demand,
            source: SuggestionSource::Baseline,
            suggested_material: String::new(),
            suggested_description: String::new(),
            suggested_center: String::new(),
            suggested_location: String::new(),
            available_qty: Decimal::ZERO,
            lot: String::new(),
            expiry: String::new(),
            offerable_qty: Decimal::ZERO,
            snapshot,
            block_status,
        }
    }

    pub fn is_baseline(&self) -> bool {
        self.source.is_baseline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_labels() {
        assert_eq!(SuggestionSource::Baseline.label(), "");
        assert_eq!(SuggestionSource::Single(SourceKind::Pnc).label(), "PNC");
        assert_eq!(
            SuggestionSource::Combined(SourceKind::Substitute, SourceKind::NearExpiry).label(),
            "Substitute/NearExpiry"
        );
        assert_eq!(
            SuggestionSource::Combined(
                SourceKind::SlowMoving,
                SourceKind::Pool("Cosmopark".to_string())
            )
            .label(),
            "SlowMoving/Cosmopark"
        );
    }

    #[test]
    fn test_substitute_derived() {
        assert!(SuggestionSource::Single(SourceKind::Substitute).is_substitute_derived());
        assert!(
            SuggestionSource::Combined(SourceKind::Substitute, SourceKind::Expired)
                .is_substitute_derived()
        );
        assert!(!SuggestionSource::Single(SourceKind::SlowMoving).is_substitute_derived());
        assert!(!SuggestionSource::Baseline.is_substitute_derived());
    }
}

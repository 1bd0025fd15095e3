//! # Recon Calculation Engine
//!
//! 多來源對帳計算引擎

pub mod consumption;
pub mod index;
pub mod matching;
pub mod report;
pub mod resolver;
pub mod snapshot;
pub mod summary;

// Re-export 主要類型
pub use consumption::ConsumptionEngine;
pub use index::SupplyIndex;
pub use matching::MatchingEngine;
pub use report::ConsumptionReport;
pub use resolver::{QuantityResolver, ResolveQuery, ResolverTable};
pub use snapshot::InventoryAggregator;
pub use summary::SummaryBuilder;

use recon_core::{ConsumptionReportRow, ConsumptionStat, SuggestionLine, SummaryRow};
use serde::{Deserialize, Serialize};

/// 供應建議計算結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// 建議列（依需求輸入順序）
    pub suggestions: Vec<SuggestionLine>,

    /// 警告信息
    pub warnings: Vec<ReconWarning>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl MatchOutcome {
    /// 創建空的計算結果
    pub fn empty() -> Self {
        Self {
            suggestions: Vec::new(),
            warnings: Vec::new(),
            calculation_time_ms: None,
        }
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: ReconWarning) {
        self.warnings.push(warning);
    }

    /// 基準列
    pub fn baselines(&self) -> impl Iterator<Item = &SuggestionLine> {
        self.suggestions.iter().filter(|s| s.is_baseline())
    }
}

/// 消耗統計結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionOutcome {
    /// 依 (中心, 物料, 儲位) 排序的統計
    pub stats: Vec<ConsumptionStat>,

    /// 前後月份顛倒的筆數
    pub anomalies: usize,

    pub warnings: Vec<ReconWarning>,
}

/// 對帳彙總結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryOutcome {
    /// 依 (中心, 儲位, 物料) 排序，鍵唯一
    pub rows: Vec<SummaryRow>,

    pub warnings: Vec<ReconWarning>,
}

/// 客戶消耗報表結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportOutcome {
    /// 依 (下單方, 收貨方, 物料) 排序
    pub rows: Vec<ConsumptionReportRow>,

    pub warnings: Vec<ReconWarning>,
}

/// 對帳警告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconWarning {
    /// 出問題的對象（訂單、物料鍵等）
    pub subject: String,
    pub message: String,
    pub severity: WarningSeverity,
}

impl ReconWarning {
    pub fn new(subject: String, message: String, severity: WarningSeverity) -> Self {
        Self {
            subject,
            message,
            severity,
        }
    }

    pub fn info(subject: String, message: String) -> Self {
        Self::new(subject, message, WarningSeverity::Info)
    }

    pub fn warning(subject: String, message: String) -> Self {
        Self::new(subject, message, WarningSeverity::Warning)
    }

    pub fn error(subject: String, message: String) -> Self {
        Self::new(subject, message, WarningSeverity::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningSeverity {
    Info,
    Warning,
    Error,
}

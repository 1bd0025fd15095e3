//! # Recon Core
//!
//! 核心資料模型與類型定義

pub mod config;
pub mod consumption;
pub mod demand;
pub mod inventory;
pub mod normalize;
pub mod period;
pub mod suggestion;
pub mod summary;
pub mod supply;
pub mod table;

// Re-export 主要類型
pub use config::{CombinationPolicy, ReconConfig};
pub use consumption::{ConsumptionReportRow, ConsumptionStat, Transaction};
pub use demand::{BlockStatus, DemandLine};
pub use inventory::{InventoryRecord, QtyBreakdown, StockSnapshot};
pub use period::MonthPeriod;
pub use suggestion::{SuggestionLine, SuggestionSource};
pub use summary::{SummaryKey, SummaryOrigin, SummaryRow};
pub use supply::{SourceKind, SubstituteMapping, SupplyPool, SupplyRow};
pub use table::{render_table, TabularRow};

/// 對帳錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error("未知的供應來源: {0}")]
    UnknownSource(String),

    #[error("無效的月份標籤: {0}")]
    InvalidPeriod(String),

    #[error("無效的日期: {0}")]
    InvalidDate(String),

    #[error("計算錯誤: {0}")]
    CalculationError(String),

    #[error("配置錯誤: {0}")]
    ConfigError(String),

    #[error("其他錯誤: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ReconError>;

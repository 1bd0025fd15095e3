//! # Recon
//!
//! 多來源庫存對帳引擎
//!
//! 依固定的來源優先順序，為每條未結需求列出可調撥的庫存建議，
//! 並產生對帳彙總與客戶消耗報表。

pub mod logging;
pub mod pipeline;

pub use pipeline::{PipelineError, ReconInputs, ReconOutputs, ReconPipeline, ReportSelection};
pub use recon_cache::{DirtyTracker, Fingerprint, InputTable, ResultCache, RunKey};
pub use recon_calc::{
    ConsumptionOutcome, MatchOutcome, ReconWarning, ReportOutcome, SummaryOutcome,
    WarningSeverity,
};
pub use recon_core::{ReconConfig, ReconError};

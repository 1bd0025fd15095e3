//! # Recon Cache
//!
//! 對帳結果緩存
//!
//! 緩存由呼叫端持有，鍵是各輸入表與配置的內容雜湊。
//! 沒有全域狀態，也不會跨行程保存。

pub mod dirty_tracking;
pub mod fingerprint;
pub mod result_cache;

// Re-export 主要類型
pub use dirty_tracking::DirtyTracker;
pub use fingerprint::{Fingerprint, InputTable, RunKey, RunTables};
pub use result_cache::{CacheStats, ResultCache};

/// 緩存錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("序列化錯誤: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;

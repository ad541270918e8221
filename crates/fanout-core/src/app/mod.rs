//! App - アプリケーション層
//!
//! ports を組み合わせてオーケストレーションのロジックを実装します。
//!
//! # 主要コンポーネント
//! - **Orchestrator**: スケジューリングループ（launch → poll → classify → wait）
//! - **IdleDetector**: 進捗停止の検知（警告のみ）
//! - **RunPlan**: dry-run 用のタスク一覧
//! - **RunReport**: 実行結果の集計と終了コード

pub mod idle;
pub mod orchestrator;
pub mod plan;
pub mod report;

pub use self::idle::{IdleDetector, IdlePhase, IdleWarning};
pub use self::orchestrator::{
    Orchestrator, OrchestratorError, OrchestratorSettings, PayloadFn, SESSION_DISAPPEARED,
};
pub use self::plan::{PlannedTask, RunPlan};
pub use self::report::{ExitStatus, RunReport};

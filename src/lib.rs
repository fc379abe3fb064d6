//! Gitのコミット履歴から作業時間を見積もるツール
//!
//! このクレートは、1つ以上のリポジトリのコミット履歴を解析し、
//! 1日の想定作業時間をその日のコミットに割り当てることで、
//! 日ごと・コミットごとの作業時間を見積もるための機能を提供します。
//!
//! # 主な機能
//!
//! - コミットログの解析と期間によるフィルタリング
//! - 日ごとのコミットのグループ化
//! - 変更行数に基づく作業時間の割り当て（standard / equal）
//! - テキスト・JSON・CSVでの結果出力
//!
//! # 使用例
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use commit_hours::{CollectOptions, GitRepository, Settings, StrategyKind, TimeEstimator, TimeWindow};
//!
//! let now = Utc::now();
//! let window = TimeWindow::new(now - Duration::days(7), now).unwrap();
//!
//! let log = GitRepository::open("path/to/repo")
//!     .unwrap()
//!     .collect(&window, &CollectOptions::default())
//!     .unwrap();
//!
//! let estimator = TimeEstimator::new(Settings::default(), StrategyKind::Standard).unwrap();
//! let result = estimator.calculate(&[log], &window).unwrap();
//! ```

pub mod config;
pub mod estimator;
pub mod report;

pub use config::{FileConfig, Settings, StrategyKind, TimeWindow};
pub use estimator::{
    Calculation, CollectOptions, Commit, EstimatorError, GitRepository, RawRepositoryLog,
    TimeEstimator,
};
pub use report::{DisplaySettings, ReportFormat};

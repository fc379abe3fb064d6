//! 作業時間見積もりの中核となるモジュール
//!
//! 見積もりは以下の流れで行われます：
//!
//! 1. リポジトリごとの生のコミットログの解析
//! 2. 対象期間によるフィルタリングと日時順のソート
//! 3. 日（UTC暦日）ごとのグループ化
//! 4. 割り当て方式による各コミットの作業時間の計算
//!
//! # 主要なコンポーネント
//!
//! - `TimeEstimator`: 解析から時間計算までを制御する構造体
//! - `Commit`: 解析済みのコミットと割り当てられた時間
//! - `TimeStrategy`: 1日の作業時間をコミットに割り当てる方式

mod commit;
mod error;
mod git;
mod parser;
mod strategy;

pub use commit::{Commit, RawRepositoryLog};
pub use error::EstimatorError;
pub use git::{discover_repositories, CollectOptions, GitRepository};
pub use parser::{project_name, CommitHeader, LogParser, StatLine};
pub use strategy::{round_to, standard_time, strategy_for, Allocation, Equal, Standard, TimeStrategy};

use crate::config::{Settings, StrategyKind, TimeWindow};
use chrono::NaiveDate;
use indexmap::IndexMap;
use tracing::{debug, info};

/// 時間計算の結果
///
/// # フィールド
///
/// - `commits`: 日時の昇順に並んだ、時間割り当て済みのコミット
/// - `commits_length_map`: 日ごとのコミット数（日付の昇順）
#[derive(Debug, Clone)]
pub struct Calculation {
    pub commits: Vec<Commit>,
    pub commits_length_map: IndexMap<NaiveDate, usize>,
}

impl Calculation {
    /// 全コミットの作業時間の合計
    pub fn total_hours(&self) -> f64 {
        self.commits.iter().map(|commit| commit.time).sum()
    }

    /// 日ごとの作業時間の合計
    pub fn hours_by_day(&self) -> IndexMap<NaiveDate, f64> {
        let mut hours = IndexMap::new();
        for commit in &self.commits {
            *hours.entry(commit.short_date).or_insert(0.0) += commit.time;
        }
        hours
    }
}

/// 作業時間の見積もりを実行するメインの構造体
///
/// # フィールド
///
/// - `settings`: 1日の作業時間などの計算設定
/// - `strategy`: 時間の割り当て方式
/// - `parser`: コミットログの解析器
pub struct TimeEstimator {
    settings: Settings,
    strategy: Box<dyn TimeStrategy>,
    parser: LogParser,
}

impl TimeEstimator {
    /// 新しいTimeEstimatorインスタンスを作成します
    ///
    /// # 引数
    ///
    /// - `settings`: 計算設定
    /// - `kind`: 割り当て方式の種類
    ///
    /// # エラー
    ///
    /// 設定値が不正な場合にエラーを返します
    pub fn new(settings: Settings, kind: StrategyKind) -> Result<Self, EstimatorError> {
        let strategy = strategy_for(kind, &settings);
        Self::with_strategy(settings, strategy)
    }

    /// 任意の割り当て方式でインスタンスを作成します
    pub fn with_strategy(
        settings: Settings,
        strategy: Box<dyn TimeStrategy>,
    ) -> Result<Self, EstimatorError> {
        settings.validate()?;
        Ok(Self {
            settings,
            strategy,
            parser: LogParser::new()?,
        })
    }

    /// コミットログを解析し、期間内のコミットを日時の昇順で返します
    pub fn parse(&self, logs: &[RawRepositoryLog], window: &TimeWindow) -> Vec<Commit> {
        self.parser.parse(logs, window)
    }

    /// コミットログを解析し、各コミットに作業時間を割り当てます
    ///
    /// 各コミットの比率は、同じ日のコミットの変更行数の合計に対する
    /// そのコミットの変更行数です。その日の合計が0の場合、比率は0になります。
    ///
    /// # 戻り値
    ///
    /// 時間割り当て済みのコミットと日ごとのコミット数
    ///
    /// # エラー
    ///
    /// 期間内にコミットが1件もない場合に`EstimatorError::NoCommitsFound`を返します
    pub fn calculate(
        &self,
        logs: &[RawRepositoryLog],
        window: &TimeWindow,
    ) -> Result<Calculation, EstimatorError> {
        let mut commits = self.parse(logs, window);
        if commits.is_empty() {
            return Err(EstimatorError::NoCommitsFound);
        }
        info!("Found {} commits", commits.len());

        let mut days: IndexMap<NaiveDate, Vec<usize>> = IndexMap::new();
        for (index, commit) in commits.iter().enumerate() {
            days.entry(commit.short_date).or_default().push(index);
        }

        let mut commits_length_map = IndexMap::new();
        for (day, indices) in &days {
            let lines_in_day: u64 = indices.iter().map(|&i| commits[i].lines).sum();
            let ratios: Vec<f64> = indices
                .iter()
                .map(|&i| ratio(commits[i].lines, lines_in_day))
                .collect();

            let allocations = self.strategy.allocate(&ratios, &self.settings);
            for (&i, allocation) in indices.iter().zip(allocations) {
                commits[i].time = allocation.time;
                commits[i].is_min_commit_time = allocation.is_min_commit_time;
            }

            debug!("{}: {} commits, {} lines", day, indices.len(), lines_in_day);
            commits_length_map.entry(*day).or_insert(indices.len());
        }

        Ok(Calculation {
            commits,
            commits_length_map,
        })
    }
}

fn ratio(lines: u64, lines_in_day: u64) -> f64 {
    if lines_in_day == 0 {
        0.0
    } else {
        lines as f64 / lines_in_day as f64
    }
}

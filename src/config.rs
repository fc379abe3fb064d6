//! 見積もり設定と設定ファイルの読み込みを担当するモジュール
//!
//! 設定値は次の優先順位で決定されます：
//!
//! 1. コマンドライン引数
//! 2. 設定ファイル（`commit-hours.toml`）
//! 3. 組み込みのデフォルト値

use crate::estimator::EstimatorError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// equal方式で指定できる丸め桁数の上限
pub const MAX_ROUND_PRECISION: u32 = 15;

/// デフォルトの設定ファイル名
pub const DEFAULT_CONFIG_FILE: &str = "commit-hours.toml";

/// 時間の割り当て方式
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Proportional split floored to multiples of the graduation
    #[default]
    Standard,
    /// Proportional split normalized so each day sums to the daily budget
    Equal,
}

/// 時間計算に使用する設定
///
/// # フィールド
///
/// - `max_hours_per_day`: 1日あたりの想定作業時間
/// - `min_commit_time`: 1コミットに割り当てる最小時間
/// - `graduation`: standard方式の丸め単位（時間）
/// - `equal_round_precision`: equal方式の丸め桁数
/// - `locale`: 日時表示に使用するロケール名（例: `en_US`, `ja_JP`）
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub max_hours_per_day: f64,
    pub min_commit_time: f64,
    pub graduation: f64,
    pub equal_round_precision: u32,
    pub locale: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_hours_per_day: 8.0,
            min_commit_time: 0.25,
            graduation: 0.25,
            equal_round_precision: 2,
            locale: "en_US".to_string(),
        }
    }
}

impl Settings {
    /// 設定値の整合性を検証します
    ///
    /// # エラー
    ///
    /// 以下の場合に`EstimatorError::InvalidSettings`を返します：
    /// - 時間の設定値が有限でない
    /// - `max_hours_per_day`が0以下
    /// - `min_commit_time`が負、または`max_hours_per_day`を超える
    /// - `graduation`が0以下
    /// - `equal_round_precision`が`MAX_ROUND_PRECISION`を超える
    pub fn validate(&self) -> Result<(), EstimatorError> {
        for (name, value) in [
            ("max_hours_per_day", self.max_hours_per_day),
            ("min_commit_time", self.min_commit_time),
            ("graduation", self.graduation),
        ] {
            if !value.is_finite() {
                return Err(EstimatorError::InvalidSettings(format!(
                    "{} must be a finite number",
                    name
                )));
            }
        }
        if self.max_hours_per_day <= 0.0 {
            return Err(EstimatorError::InvalidSettings(
                "max_hours_per_day must be positive".to_string(),
            ));
        }
        if self.min_commit_time < 0.0 {
            return Err(EstimatorError::InvalidSettings(
                "min_commit_time must not be negative".to_string(),
            ));
        }
        if self.min_commit_time > self.max_hours_per_day {
            return Err(EstimatorError::InvalidSettings(
                "min_commit_time must not exceed max_hours_per_day".to_string(),
            ));
        }
        if self.graduation <= 0.0 {
            return Err(EstimatorError::InvalidSettings(
                "graduation must be positive".to_string(),
            ));
        }
        if self.equal_round_precision > MAX_ROUND_PRECISION {
            return Err(EstimatorError::InvalidSettings(format!(
                "equal_round_precision must be at most {}",
                MAX_ROUND_PRECISION
            )));
        }
        Ok(())
    }
}

/// 集計対象期間（両端を含まない）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, EstimatorError> {
        if start >= end {
            return Err(EstimatorError::InvalidWindow);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// `start < timestamp < end`の場合に`true`を返します
    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        self.start < *timestamp && *timestamp < self.end
    }
}

/// コマンドラインで指定された日付を解釈します
///
/// `YYYY-MM-DD`（UTCの0時）またはRFC 3339形式を受け付けます。
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, EstimatorError> {
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc());
    }
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EstimatorError::ConfigError(format!("invalid date '{}': {}", input, e)))
}

/// 設定ファイルの内容
///
/// すべてのフィールドは省略可能で、省略されたものはデフォルト値または
/// コマンドライン引数で補われます。
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub repositories: Option<Vec<PathBuf>>,
    pub author: Option<String>,
    pub strategy: Option<StrategyKind>,
    pub max_hours_per_day: Option<f64>,
    pub min_commit_time: Option<f64>,
    pub graduation: Option<f64>,
    pub equal_round_precision: Option<u32>,
    pub locale: Option<String>,
}

impl FileConfig {
    /// 指定されたTOMLファイルを読み込みます
    ///
    /// # エラー
    ///
    /// ファイルの読み込みまたはTOMLの解析に失敗した場合にエラーを返します
    pub fn from_path(path: &Path) -> Result<Self, EstimatorError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| EstimatorError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// 設定ファイルを探して読み込みます
    ///
    /// `explicit`が指定された場合はそのファイルを必ず読み込み、失敗はエラーになります。
    /// 指定がない場合は`dir`直下の`commit-hours.toml`を探し、
    /// 読み込めなければ警告を出してデフォルトを使用します。
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, EstimatorError> {
        if let Some(path) = explicit {
            let config = Self::from_path(path)?;
            debug!("Loaded config from {}", path.display());
            return Ok(config);
        }

        let default_path = dir.join(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            match Self::from_path(&default_path) {
                Ok(config) => {
                    debug!("Loaded config from {}", default_path.display());
                    return Ok(config);
                }
                Err(e) => {
                    warn!("Failed to load {}: {}", default_path.display(), e);
                }
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// ファイルの値をデフォルト設定に重ねた`Settings`を返します
    pub fn settings(&self) -> Settings {
        let defaults = Settings::default();
        Settings {
            max_hours_per_day: self.max_hours_per_day.unwrap_or(defaults.max_hours_per_day),
            min_commit_time: self.min_commit_time.unwrap_or(defaults.min_commit_time),
            graduation: self.graduation.unwrap_or(defaults.graduation),
            equal_round_precision: self
                .equal_round_precision
                .unwrap_or(defaults.equal_round_precision),
            locale: self.locale.clone().unwrap_or(defaults.locale),
        }
    }
}

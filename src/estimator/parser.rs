//! 生のコミットログをコミットレコードに変換するモジュール
//!
//! 解析は寛容に行われます。欠けている数値フィールドは0として扱い、
//! 1つのブロックが壊れていても全体の処理は失敗しません。

use super::commit::{Commit, RawRepositoryLog};
use super::error::EstimatorError;
use crate::config::TimeWindow;
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

/// コミットブロックの1行目（説明行）
///
/// セミコロン区切りで`fullhash;shorthash;epoch秒;メッセージ`の順に並びます。
/// メッセージ内のセミコロンはメッセージの一部として保持されます。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommitHeader {
    pub fullhash: String,
    pub hash: String,
    pub epoch_seconds: Option<i64>,
    pub message: Option<String>,
}

impl CommitHeader {
    pub fn parse(line: &str) -> Self {
        let mut fields = line.splitn(4, ';');
        let fullhash = fields.next().unwrap_or_default().trim().to_string();
        let hash = fields.next().unwrap_or_default().trim().to_string();
        let epoch_seconds = fields.next().and_then(|s| s.trim().parse().ok());
        let message = fields.next().map(|s| s.trim().to_string());

        Self {
            fullhash,
            hash,
            epoch_seconds,
            message,
        }
    }

    /// コミット日時。エポック秒が欠けている場合はUNIXエポックになります
    pub fn date(&self) -> DateTime<Utc> {
        self.epoch_seconds
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_default()
    }
}

/// コミットブロックの2行目（差分統計行）
///
/// 各フィールドは統計行に現れなかった場合`None`になります。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatLine {
    pub files_changed: Option<u64>,
    pub insertions: Option<u64>,
    pub deletions: Option<u64>,
}

impl StatLine {
    pub fn insertions(&self) -> u64 {
        self.insertions.unwrap_or(0)
    }

    pub fn deletions(&self) -> u64 {
        self.deletions.unwrap_or(0)
    }

    /// 変更行数（追加行数 + 削除行数）
    pub fn lines(&self) -> u64 {
        self.insertions() + self.deletions()
    }
}

/// コミットログの解析器
///
/// # フィールド
///
/// - `files_changed`: `N file(s) changed`に一致する正規表現
/// - `insertions`: `N insertion(s)(+)`に一致する正規表現
/// - `deletions`: `N deletion(s)(-)`に一致する正規表現
pub struct LogParser {
    files_changed: Regex,
    insertions: Regex,
    deletions: Regex,
}

impl LogParser {
    /// 新しい解析器を作成します
    ///
    /// # エラー
    ///
    /// 統計行のパターンのコンパイルに失敗した場合にエラーを返します
    pub fn new() -> Result<Self, EstimatorError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| EstimatorError::InvalidPattern(e.to_string()))
        };

        Ok(Self {
            files_changed: compile(r"(\d+) files? changed")?,
            insertions: compile(r"(\d+) insertions?\(\+\)")?,
            deletions: compile(r"(\d+) deletions?\(-\)")?,
        })
    }

    /// 差分統計行を解析します
    pub fn parse_stat_line(&self, line: &str) -> StatLine {
        let capture = |regex: &Regex| {
            regex
                .captures(line)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        };

        StatLine {
            files_changed: capture(&self.files_changed),
            insertions: capture(&self.insertions),
            deletions: capture(&self.deletions),
        }
    }

    /// 1つのコミットブロックを解析します
    ///
    /// 空のブロックの場合は`None`を返します。統計行がない場合は変更行数0として扱います。
    /// `time`はまだ計算されていないため0になります。
    pub fn parse_block(&self, block: &str, project: &str) -> Option<Commit> {
        let mut lines = block.lines().filter(|line| !line.trim().is_empty());
        let header = CommitHeader::parse(lines.next()?);
        let stats = lines
            .next()
            .map(|line| self.parse_stat_line(line))
            .unwrap_or_default();

        let date = header.date();
        Some(Commit {
            short_date: date.date_naive(),
            date,
            text: header.message.unwrap_or_default(),
            fullhash: header.fullhash,
            hash: header.hash,
            project: project.to_string(),
            insertions: stats.insertions(),
            deletions: stats.deletions(),
            lines: stats.lines(),
            time: 0.0,
            is_min_commit_time: false,
        })
    }

    /// 全リポジトリのログを解析し、期間内のコミットを日時の昇順で返します
    ///
    /// # 引数
    ///
    /// - `logs`: リポジトリごとの生のコミットログ
    /// - `window`: 対象期間（両端を含まない）
    ///
    /// # 戻り値
    ///
    /// 期間内のコミットのベクター。該当するコミットがなければ空になります。
    pub fn parse(&self, logs: &[RawRepositoryLog], window: &TimeWindow) -> Vec<Commit> {
        let mut commits = Vec::new();

        for log in logs {
            let project = project_name(&log.repository_path);
            let before = commits.len();

            commits.extend(
                log.commit_blocks
                    .iter()
                    .filter_map(|block| self.parse_block(block, &project))
                    .filter(|commit| window.contains(&commit.date)),
            );

            debug!(
                "{}: {} of {} commits inside the window",
                project,
                commits.len() - before,
                log.commit_blocks.len()
            );
        }

        commits.sort_by_key(|commit| commit.date);
        commits
    }
}

/// リポジトリパスからプロジェクト名を導出します
///
/// パスの末尾が`.git`であればその1つ前の要素を、そうでなければ末尾の要素を返します。
///
/// ```
/// use commit_hours::estimator::project_name;
///
/// assert_eq!(project_name("/home/dev/api/.git"), "api");
/// assert_eq!(project_name("/home/dev/api/.git/"), "api");
/// ```
pub fn project_name(repository_path: &str) -> String {
    let segments: Vec<&str> = repository_path
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect();

    match segments.as_slice() {
        [.., project, last] if *last == ".git" => project.to_string(),
        [.., last] => last.to_string(),
        [] => String::new(),
    }
}

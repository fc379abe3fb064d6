//! コミット履歴の入力と見積もり結果の表現を担当するモジュール
//!
//! このモジュールは、ログ収集側から渡される生のコミットログと、
//! 解析・時間計算を終えたコミットレコードのデータ構造を提供します。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 1つのリポジトリから収集された生のコミットログ
///
/// # フィールド
///
/// - `repository_path`: リポジトリの`.git`ディレクトリのパス
/// - `commit_blocks`: コミットごとのテキストブロック
///
/// 各ブロックは次の2行で構成されます：
///
/// ```text
/// <fullhash>;<shorthash>;<epoch秒>;<メッセージ>
///  N files changed, X insertions(+), Y deletions(-)
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRepositoryLog {
    pub repository_path: String,
    pub commit_blocks: Vec<String>,
}

impl RawRepositoryLog {
    pub fn new(repository_path: impl Into<String>, commit_blocks: Vec<String>) -> Self {
        Self {
            repository_path: repository_path.into(),
            commit_blocks,
        }
    }
}

/// 解析済みのコミットと、割り当てられた作業時間
///
/// # フィールド
///
/// - `fullhash`: 完全なコミットハッシュ
/// - `hash`: 短縮ハッシュ
/// - `date`: コミット日時（UTC）
/// - `short_date`: `date`のUTC暦日（日単位のグループ化キー）
/// - `text`: コミットメッセージ
/// - `project`: リポジトリパスから導出したプロジェクト名
/// - `insertions` / `deletions`: 追加行数と削除行数
/// - `lines`: `insertions + deletions`
/// - `time`: 割り当てられた作業時間（時間単位）
/// - `is_min_commit_time`: 最小コミット時間に固定されたかどうか
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub fullhash: String,
    pub hash: String,
    pub date: DateTime<Utc>,
    pub short_date: NaiveDate,
    pub text: String,
    pub project: String,
    pub insertions: u64,
    pub deletions: u64,
    pub lines: u64,
    #[serde(serialize_with = "round_to_3")]
    pub time: f64,
    pub is_min_commit_time: bool,
}

/// 浮動小数点数を3桁に丸める補助関数
fn round_to_3<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64((*value * 1000.0).round() / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_commit(time: f64) -> Commit {
        let date = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        Commit {
            fullhash: "0123456789abcdef0123456789abcdef01234567".to_string(),
            hash: "0123456".to_string(),
            date,
            short_date: date.date_naive(),
            text: "Fix parser".to_string(),
            project: "demo".to_string(),
            insertions: 12,
            deletions: 3,
            lines: 15,
            time,
            is_min_commit_time: false,
        }
    }

    #[test]
    fn test_commit_serialization() {
        let commit = sample_commit(1.23456);

        let json = serde_json::to_value(&commit).unwrap();

        assert_eq!(json["short_date"], "2024-03-05");
        assert_eq!(json["project"], "demo");
        assert_eq!(json["lines"], 15);
        // 時間は3桁に丸められる
        assert!((json["time"].as_f64().unwrap() - 1.235).abs() < 0.0001);
    }

    #[test]
    fn test_commit_deserializes_rounded_time() {
        let commit = sample_commit(0.33333);

        let json = serde_json::to_string(&commit).unwrap();
        let deserialized: Commit = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.fullhash, commit.fullhash);
        assert_eq!(deserialized.date, commit.date);
        assert_eq!(deserialized.short_date, commit.short_date);
        assert!((deserialized.time - 0.333).abs() < 0.0001);
    }
}

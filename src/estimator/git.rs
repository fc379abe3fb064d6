//! Gitリポジトリからコミットログを収集するモジュール
//!
//! このモジュールは、libgit2を使用してコミット履歴を走査し、
//! 解析器が受け取る形式のコミットブロックを生成します。

use super::commit::RawRepositoryLog;
use super::error::EstimatorError;
use crate::config::TimeWindow;
use chrono::DateTime;
use git2::{Commit, DiffStatsFormat, ErrorCode, Repository};
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// コミット収集時のオプション
///
/// # フィールド
///
/// - `author`: 作者名またはメールアドレスに含まれる文字列（大文字小文字を区別しない）
/// - `include_merges`: マージコミットを含めるかどうか
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    pub author: Option<String>,
    pub include_merges: bool,
}

/// Gitリポジトリへのアクセスを管理する構造体
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// 指定されたパスのGitリポジトリをオープンします
    ///
    /// # エラー
    ///
    /// パスが有効なGitリポジトリでない場合にエラーを返します
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EstimatorError> {
        Ok(Self {
            repo: Repository::open(path)?,
        })
    }

    /// `.git`ディレクトリのパス
    pub fn git_dir(&self) -> String {
        self.repo.path().to_string_lossy().into_owned()
    }

    /// 対象期間内のコミットをコミットブロックとして収集します
    ///
    /// # 引数
    ///
    /// - `window`: 対象期間
    /// - `options`: 作者フィルタとマージコミットの扱い
    ///
    /// # 戻り値
    ///
    /// リポジトリの生のコミットログ。HEADが存在しない空のリポジトリでは空のログを返します。
    ///
    /// # エラー
    ///
    /// 以下の場合にエラーを返します：
    /// - コミット履歴の走査に失敗
    /// - 差分統計の計算に失敗
    pub fn collect(
        &self,
        window: &TimeWindow,
        options: &CollectOptions,
    ) -> Result<RawRepositoryLog, EstimatorError> {
        let mut log = RawRepositoryLog::new(self.git_dir(), Vec::new());

        if self.repo.is_empty()? {
            debug!("{}: no commits yet", log.repository_path);
            return Ok(log);
        }
        if let Err(e) = self.repo.head() {
            if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) {
                debug!("{}: HEAD is unborn", log.repository_path);
                return Ok(log);
            }
            return Err(e.into());
        }

        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(git2::Sort::TIME)?;

        let author = options.author.as_deref().map(str::to_lowercase);

        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;

            // 範囲外のタイムスタンプと期間外のコミットはスキップ
            match DateTime::from_timestamp(commit.time().seconds(), 0) {
                Some(commit_time) if window.contains(&commit_time) => {}
                _ => continue,
            }

            // マージコミットを除外
            if !options.include_merges && commit.parent_count() > 1 {
                continue;
            }

            if let Some(ref author) = author {
                if !authored_by(&commit, author) {
                    continue;
                }
            }

            log.commit_blocks.push(self.commit_block(&commit)?);
        }

        debug!(
            "{}: collected {} commits",
            log.repository_path,
            log.commit_blocks.len()
        );
        Ok(log)
    }

    /// `<fullhash>;<shorthash>;<epoch秒>;<メッセージ>`と短い差分統計の2行を生成します
    fn commit_block(&self, commit: &Commit) -> Result<String, EstimatorError> {
        let tree = commit.tree()?;
        let parent_tree = commit.parent(0).ok().and_then(|parent| parent.tree().ok());

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
        let stats = diff.stats()?.to_buf(DiffStatsFormat::SHORT, 80)?;
        let short_id = commit.as_object().short_id()?;

        Ok(format!(
            "{};{};{};{}\n{}",
            commit.id(),
            short_id.as_str().unwrap_or_default(),
            commit.time().seconds(),
            commit.summary().unwrap_or_default(),
            stats.as_str().unwrap_or_default().trim_end()
        ))
    }
}

fn authored_by(commit: &Commit, needle: &str) -> bool {
    let author = commit.author();
    let matches = |field: Option<&str>| field.map_or(false, |f| f.to_lowercase().contains(needle));
    matches(author.name()) || matches(author.email())
}

/// 指定されたディレクトリ以下のGitリポジトリを探します
///
/// ルート自身がリポジトリであればそれを返し、そうでなければ`max_depth`階層まで
/// `.git`を含むディレクトリを探索します。隠しディレクトリと`.gitignore`で
/// 除外されたディレクトリは探索しません。
///
/// # 戻り値
///
/// 見つかったリポジトリの作業ディレクトリ（重複なし、ソート済み）
pub fn discover_repositories(roots: &[PathBuf], max_depth: usize) -> Vec<PathBuf> {
    let mut found = BTreeSet::new();

    for root in roots {
        if root.join(".git").exists() {
            found.insert(root.clone());
            continue;
        }

        for entry in WalkBuilder::new(root).max_depth(Some(max_depth)).build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable path under {}: {}", root.display(), e);
                    continue;
                }
            };

            let is_dir = entry.file_type().map_or(false, |ft| ft.is_dir());
            if is_dir && entry.path().join(".git").exists() {
                found.insert(entry.into_path());
            }
        }
    }

    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use git2::{Oid, Signature, Time};
    use std::fs;

    const ALICE: (&str, &str) = ("Alice", "alice@example.com");
    const BOB: (&str, &str) = ("Bob", "bob@example.com");

    fn epoch(day: u32, hour: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap().timestamp()
    }

    fn march() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn commit_file(
        repo: &Repository,
        name: &str,
        content: &str,
        message: &str,
        time: i64,
        author: (&str, &str),
    ) -> Oid {
        let workdir = repo.workdir().unwrap();
        fs::write(workdir.join(name), content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

        let signature = Signature::new(author.0, author.1, &Time::new(time, 0)).unwrap();
        let parents: Vec<_> = repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<_> = parents.iter().collect();

        repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parent_refs)
            .unwrap()
    }

    #[test]
    fn test_collect_builds_commit_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let oid = commit_file(&repo, "a.txt", "1\n2\n3\n", "Add a", epoch(4, 9), ALICE);
        commit_file(&repo, "a.txt", "1\n", "Trim a", epoch(5, 9), ALICE);

        let git_repo = GitRepository::open(dir.path()).unwrap();
        let log = git_repo.collect(&march(), &CollectOptions::default()).unwrap();

        assert!(log.repository_path.trim_end_matches('/').ends_with(".git"));
        assert_eq!(log.commit_blocks.len(), 2);

        let first = log
            .commit_blocks
            .iter()
            .find(|block| block.contains("Add a"))
            .unwrap();
        let mut lines = first.lines();
        let header: Vec<_> = lines.next().unwrap().split(';').collect();
        assert_eq!(header[0], oid.to_string());
        assert!(oid.to_string().starts_with(header[1]));
        assert_eq!(header[2], epoch(4, 9).to_string());
        assert_eq!(header[3], "Add a");
        let stats = lines.next().unwrap();
        assert!(stats.contains("1 file changed"), "unexpected stats: {}", stats);
        assert!(stats.contains("3 insertions(+)"), "unexpected stats: {}", stats);

        let second = log
            .commit_blocks
            .iter()
            .find(|block| block.contains("Trim a"))
            .unwrap();
        assert!(second.contains("2 deletions(-)"), "unexpected block: {}", second);
    }

    #[test]
    fn test_collect_filters_window_and_author() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "a.txt", "a\n", "February", epoch(1, 0) - 3600, ALICE);
        commit_file(&repo, "b.txt", "b\n", "Alice work", epoch(2, 10), ALICE);
        commit_file(&repo, "c.txt", "c\n", "Bob work", epoch(3, 10), BOB);

        let git_repo = GitRepository::open(dir.path()).unwrap();

        let log = git_repo.collect(&march(), &CollectOptions::default()).unwrap();
        assert_eq!(log.commit_blocks.len(), 2);

        let options = CollectOptions {
            author: Some("BOB@EXAMPLE".to_string()),
            include_merges: false,
        };
        let log = git_repo.collect(&march(), &options).unwrap();
        assert_eq!(log.commit_blocks.len(), 1);
        assert!(log.commit_blocks[0].contains("Bob work"));
    }

    #[test]
    fn test_collect_skips_merges_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "a.txt", "a\n", "Main", epoch(2, 10), ALICE);

        let signature = Signature::new(ALICE.0, ALICE.1, &Time::new(epoch(3, 10), 0)).unwrap();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        let tree = head.tree().unwrap();
        let side_oid = repo
            .commit(None, &signature, &signature, "Side", &tree, &[])
            .unwrap();
        let side = repo.find_commit(side_oid).unwrap();
        repo.commit(Some("HEAD"), &signature, &signature, "Merge side", &tree, &[&head, &side])
            .unwrap();

        let git_repo = GitRepository::open(dir.path()).unwrap();

        let log = git_repo.collect(&march(), &CollectOptions::default()).unwrap();
        assert_eq!(log.commit_blocks.len(), 2);
        assert!(log.commit_blocks.iter().all(|b| !b.contains("Merge side")));

        let options = CollectOptions {
            include_merges: true,
            ..CollectOptions::default()
        };
        let log = git_repo.collect(&march(), &options).unwrap();
        assert_eq!(log.commit_blocks.len(), 3);
    }

    #[test]
    fn test_collect_empty_repository() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();

        let git_repo = GitRepository::open(dir.path()).unwrap();
        let log = git_repo.collect(&march(), &CollectOptions::default()).unwrap();

        assert!(log.commit_blocks.is_empty());
    }

    #[test]
    fn test_collect_unborn_head_with_other_branches() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "a.txt", "a\n", "On default branch", epoch(2, 10), ALICE);
        repo.set_head("refs/heads/not-created-yet").unwrap();

        let git_repo = GitRepository::open(dir.path()).unwrap();
        let log = git_repo.collect(&march(), &CollectOptions::default()).unwrap();

        assert!(log.commit_blocks.is_empty());
    }

    #[test]
    fn test_collect_filters_author_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "a.txt", "a\n", "Alice work", epoch(2, 10), ALICE);
        commit_file(&repo, "b.txt", "b\n", "Bob work", epoch(3, 10), BOB);

        let options = CollectOptions {
            author: Some("alice".to_string()),
            include_merges: false,
        };
        let git_repo = GitRepository::open(dir.path()).unwrap();
        let log = git_repo.collect(&march(), &options).unwrap();

        assert_eq!(log.commit_blocks.len(), 1);
        assert!(log.commit_blocks[0].contains("Alice work"));
    }

    #[test]
    fn test_open_rejects_plain_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            GitRepository::open(dir.path()),
            Err(EstimatorError::GitError(_))
        ));
    }

    #[test]
    fn test_discover_repositories() {
        let dir = tempfile::tempdir().unwrap();
        let api = dir.path().join("api");
        let web = dir.path().join("clients").join("web");
        let deep = dir.path().join("a").join("b").join("c").join("deep");
        fs::create_dir_all(dir.path().join("notes")).unwrap();
        for path in [&api, &web, &deep] {
            fs::create_dir_all(path).unwrap();
            Repository::init(path).unwrap();
        }

        let found = discover_repositories(&[dir.path().to_path_buf()], 2);
        assert_eq!(found, vec![api.clone(), web.clone()]);

        // ルート自身がリポジトリの場合
        let found = discover_repositories(&[api.clone(), api.clone()], 2);
        assert_eq!(found, vec![api]);
    }
}

//! 見積もり結果の出力を担当するモジュール
//!
//! テキスト形式ではコミットごとに1行を出力し、日時はロケールに合わせて整形します。
//! JSONとCSVは機械処理向けの形式です。

use crate::estimator::{Calculation, Commit, EstimatorError};
use chrono::{DateTime, Local, Locale, TimeZone};
use console::style;
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;

/// テキスト出力で使う日時の書式（ロケールの日付表記 + 時刻）
pub const DATE_FORMAT: &str = "%x %H:%M";

/// 出力形式
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// One colored line per commit
    #[default]
    Text,
    /// Pretty-printed JSON document
    Json,
    /// One CSV record per commit
    Csv,
}

/// テキスト出力の表示設定
///
/// # フィールド
///
/// - `locale`: 日時の整形に使用するロケール
/// - `summary`: 日ごとの集計行を出力するかどうか
#[derive(Debug, Clone, Copy)]
pub struct DisplaySettings {
    pub locale: Locale,
    pub summary: bool,
}

impl DisplaySettings {
    /// ロケール名から表示設定を作成します
    ///
    /// `en_US`のほか、`en-US`や`en_US.UTF-8`のような表記も受け付けます。
    ///
    /// # エラー
    ///
    /// 未知のロケール名の場合に`EstimatorError::InvalidLocale`を返します
    pub fn new(locale: &str, summary: bool) -> Result<Self, EstimatorError> {
        Ok(Self {
            locale: parse_locale(locale)?,
            summary,
        })
    }
}

pub fn parse_locale(name: &str) -> Result<Locale, EstimatorError> {
    let normalized = name
        .split('.')
        .next()
        .unwrap_or_default()
        .replace('-', "_");
    Locale::try_from(normalized.as_str())
        .map_err(|_| EstimatorError::InvalidLocale(name.to_string()))
}

/// 日時をロケールに合わせて整形します
pub fn localized_date<Tz>(date: &DateTime<Tz>, format: &str, locale: Locale) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    date.format_localized(format, locale).to_string()
}

/// 1コミット分の出力行を生成します
pub fn format_line(commit: &Commit, locale: Locale) -> String {
    let date = localized_date(&commit.date.with_timezone(&Local), DATE_FORMAT, locale);
    format!(
        "{}  {}  {}  {}",
        style(date).cyan(),
        style(&commit.project).green().bold(),
        style(format!("{:>5.2}h", commit.time)).yellow(),
        commit.text
    )
}

/// コミットを入力順に1行ずつ出力します
pub fn report(
    commits: &[Commit],
    display: &DisplaySettings,
    out: &mut impl Write,
) -> Result<(), EstimatorError> {
    for commit in commits {
        writeln!(out, "{}", format_line(commit, display.locale))?;
    }
    Ok(())
}

/// 日ごとのコミット数と作業時間、および合計を出力します
pub fn report_summary(calculation: &Calculation, out: &mut impl Write) -> Result<(), EstimatorError> {
    let hours = calculation.hours_by_day();

    writeln!(out)?;
    for (day, count) in &calculation.commits_length_map {
        writeln!(
            out,
            "{}  {:>3} commits  {:>6.2}h",
            day.format("%Y-%m-%d"),
            count,
            hours.get(day).copied().unwrap_or_default()
        )?;
    }
    writeln!(
        out,
        "{}",
        style(format!(
            "Total: {} commits, {:.2}h",
            calculation.commits.len(),
            calculation.total_hours()
        ))
        .bold()
    )?;
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    total_hours: f64,
    commits_length_map: &'a indexmap::IndexMap<chrono::NaiveDate, usize>,
    commits: &'a [Commit],
}

/// 計算結果をJSONで出力します
pub fn write_json(calculation: &Calculation, out: &mut impl Write) -> Result<(), EstimatorError> {
    let report = JsonReport {
        total_hours: (calculation.total_hours() * 1000.0).round() / 1000.0,
        commits_length_map: &calculation.commits_length_map,
        commits: &calculation.commits,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

/// コミットをCSVで出力します
pub fn write_csv(commits: &[Commit], out: &mut impl Write) -> Result<(), EstimatorError> {
    let mut wtr = csv::Writer::from_writer(out);
    for commit in commits {
        wtr.serialize(commit)?;
    }
    wtr.flush()?;
    Ok(())
}

/// 指定された形式で計算結果を出力します
pub fn render(
    calculation: &Calculation,
    format: ReportFormat,
    display: &DisplaySettings,
    out: &mut impl Write,
) -> Result<(), EstimatorError> {
    match format {
        ReportFormat::Text => {
            report(&calculation.commits, display, out)?;
            if display.summary {
                report_summary(calculation, out)?;
            }
            Ok(())
        }
        ReportFormat::Json => write_json(calculation, out),
        ReportFormat::Csv => write_csv(&calculation.commits, out),
    }
}

//! 1日の作業時間をコミットに割り当てる方式を提供するモジュール
//!
//! - `Standard`: 変更行数の比率で按分し、`graduation`の倍数に切り捨てる
//! - `Equal`: 変更行数の比率で按分し、1日の合計が`max_hours_per_day`になるよう正規化する

use crate::config::{Settings, StrategyKind};

/// 1コミットへの割り当て結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    pub time: f64,
    /// 最小コミット時間に固定された場合`true`
    pub is_min_commit_time: bool,
}

impl Allocation {
    fn pinned(min_commit_time: f64) -> Self {
        Self {
            time: min_commit_time,
            is_min_commit_time: true,
        }
    }

    fn free(time: f64) -> Self {
        Self {
            time,
            is_min_commit_time: false,
        }
    }
}

/// 日ごとの時間割り当て方式
pub trait TimeStrategy {
    /// 1日分のコミットの比率から、それぞれの作業時間を計算します
    ///
    /// # 引数
    ///
    /// - `ratios`: その日の合計変更行数に対する各コミットの変更行数の比率
    /// - `settings`: 1日の作業時間と最小コミット時間
    ///
    /// # 戻り値
    ///
    /// `ratios`と同じ順序・同じ長さの割り当て結果
    fn allocate(&self, ratios: &[f64], settings: &Settings) -> Vec<Allocation>;
}

/// 比率で按分し、`graduation`時間単位に切り捨てる方式
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standard {
    pub graduation: f64,
}

impl TimeStrategy for Standard {
    fn allocate(&self, ratios: &[f64], settings: &Settings) -> Vec<Allocation> {
        ratios
            .iter()
            .map(|&ratio| {
                standard_time(
                    ratio,
                    settings.max_hours_per_day,
                    self.graduation,
                    settings.min_commit_time,
                )
            })
            .collect()
    }
}

/// 1コミット分のstandard方式の計算
///
/// `floor(ratio * max_hours_per_day / graduation) * graduation`を計算し、
/// 結果が0の場合は`min_commit_time`を割り当てます。
pub fn standard_time(
    ratio: f64,
    max_hours_per_day: f64,
    graduation: f64,
    min_commit_time: f64,
) -> Allocation {
    let time = ((ratio * max_hours_per_day) / graduation).floor() * graduation;
    if time == 0.0 || !time.is_finite() {
        Allocation::pinned(min_commit_time)
    } else {
        Allocation::free(time)
    }
}

/// 1日の合計が`max_hours_per_day`になるよう按分する方式
///
/// `min_commit_time`に満たないコミットを最小値に固定し、
/// 残りの時間を固定されなかったコミットに比率どおり再配分します。
/// 再配分は1回だけ行われるため、再配分後に`min_commit_time`を下回るコミットは
/// そのまま残ります。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Equal {
    pub precision: u32,
}

impl TimeStrategy for Equal {
    fn allocate(&self, ratios: &[f64], settings: &Settings) -> Vec<Allocation> {
        let max = settings.max_hours_per_day;
        let min = settings.min_commit_time;

        let mut allocations: Vec<Allocation> = ratios
            .iter()
            .map(|&ratio| {
                let time = ratio * max;
                if time < min {
                    Allocation::pinned(min)
                } else {
                    Allocation::free(time)
                }
            })
            .collect();

        let pinned = allocations.iter().filter(|a| a.is_min_commit_time).count();
        let remaining = (max - pinned as f64 * min).max(0.0);

        for allocation in allocations.iter_mut().filter(|a| !a.is_min_commit_time) {
            allocation.time = (allocation.time / max) * remaining;
        }

        for allocation in &mut allocations {
            let time = round_to(allocation.time, self.precision.saturating_add(1));
            allocation.time = round_to(time, self.precision);
        }

        allocations
    }
}

/// `digits`桁に四捨五入します
///
/// 桁数が大きすぎて丸めが表現できない場合は値をそのまま返します。
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits.min(i32::MAX as u32) as i32);
    let scaled = value * factor;
    if !factor.is_finite() || !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// 設定に応じた割り当て方式を作成します
pub fn strategy_for(kind: StrategyKind, settings: &Settings) -> Box<dyn TimeStrategy> {
    match kind {
        StrategyKind::Standard => Box::new(Standard {
            graduation: settings.graduation,
        }),
        StrategyKind::Equal => Box::new(Equal {
            precision: settings.equal_round_precision,
        }),
    }
}

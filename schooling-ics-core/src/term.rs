use std::{fs, path::Path};

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    exclusion::{ExclusionCalendar, ExclusionRange},
    types::hhmm,
};

/// 夜間スクーリングの回数
pub const EVENING_SESSION_COUNT: u32 = 12;
/// 夜間スクーリングで調べる週オフセットの上限（0..=25、最大26候補）
pub const EVENING_CANDIDATE_LIMIT: u32 = 25;
/// 週末集中スクーリングの週数
pub const WEEKEND_COUNT: u32 = 3;
/// 学期設定で許す週数の上限（候補週・週末数とも）
pub const MAX_TERM_WEEKS: u32 = 520;

/// 一コマの開始・終了時刻
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    fn hm(start: (u32, u32), end: (u32, u32)) -> Self {
        Self {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap_or_default(),
        }
    }
}

/// 学期設定
///
/// 開講期間・除外期間・週末集中の開始日などを一つにまとめたもの。
/// `Default` は 2025 年度秋学期の値。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermConfig {
    /// 学期開始日（夜間スクーリングの起点）
    pub start_date: NaiveDate,
    /// 学期終了日。これより後の候補日は調べない
    pub end_date: Option<NaiveDate>,
    /// 週末集中の最初の土曜日
    pub weekend_anchor: NaiveDate,
    /// 夜間スクーリングを行わない期間
    pub exclusions: Vec<ExclusionRange>,
    /// 教室
    pub location: String,
    pub evening: TimeSlot,
    pub weekend_saturday: TimeSlot,
    pub weekend_sunday: TimeSlot,
    pub evening_sessions: u32,
    pub evening_candidate_limit: u32,
    pub weekend_count: u32,
}

impl Default for TermConfig {
    fn default() -> Self {
        Self {
            start_date: ymd(2025, 10, 1),
            end_date: Some(ymd(2026, 1, 31)),
            weekend_anchor: ymd(2025, 10, 11),
            exclusions: vec![
                ExclusionRange::new("三田祭", ymd(2025, 11, 19), ymd(2025, 11, 24)),
                ExclusionRange::new("年末年始", ymd(2025, 12, 29), ymd(2026, 1, 5)),
            ],
            location: "三田キャンパス".to_string(),
            evening: TimeSlot::hm((18, 20), (20, 5)),
            weekend_saturday: TimeSlot::hm((13, 30), (17, 15)),
            weekend_sunday: TimeSlot::hm((9, 0), (12, 45)),
            evening_sessions: EVENING_SESSION_COUNT,
            evening_candidate_limit: EVENING_CANDIDATE_LIMIT,
            weekend_count: WEEKEND_COUNT,
        }
    }
}

impl TermConfig {
    /// JSON文字列から読み込む。省略された項目は既定値になる
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = fs::read_to_string(path_ref).map_err(|err| {
            Error::Config(format!(
                "cannot read term config {}: {}",
                path_ref.display(),
                err
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 設定値の整合性を検査する
    pub fn validate(&self) -> Result<()> {
        for (name, slot) in [
            ("evening", &self.evening),
            ("weekend_saturday", &self.weekend_saturday),
            ("weekend_sunday", &self.weekend_sunday),
        ] {
            if slot.start >= slot.end {
                return Err(Error::Config(format!(
                    "time slot '{}' must start before it ends ({} >= {})",
                    name,
                    slot.start.format("%H:%M"),
                    slot.end.format("%H:%M")
                )));
            }
        }

        for range in &self.exclusions {
            if range.start > range.end {
                return Err(Error::Config(format!(
                    "exclusion range '{}' ends before it starts ({} > {})",
                    range.label, range.start, range.end
                )));
            }
        }

        if let Some(end) = self.end_date.filter(|end| *end < self.start_date) {
            return Err(Error::Config(format!(
                "term ends ({}) before it starts ({})",
                end, self.start_date
            )));
        }

        if self.weekend_anchor.weekday() != Weekday::Sat {
            return Err(Error::Config(format!(
                "weekend anchor {} is a {:?}, expected a Saturday",
                self.weekend_anchor,
                self.weekend_anchor.weekday()
            )));
        }

        if self.evening_sessions == 0 || self.weekend_count == 0 {
            return Err(Error::Config(
                "session counts must be positive".to_string(),
            ));
        }

        for (name, weeks) in [
            ("evening_sessions", self.evening_sessions),
            ("evening_candidate_limit", self.evening_candidate_limit),
            ("weekend_count", self.weekend_count),
        ] {
            if weeks > MAX_TERM_WEEKS {
                return Err(Error::Config(format!(
                    "{} is {}, at most {} weeks are allowed",
                    name, weeks, MAX_TERM_WEEKS
                )));
            }
        }

        Ok(())
    }

    pub fn exclusion_calendar(&self) -> ExclusionCalendar {
        ExclusionCalendar::new(self.exclusions.clone())
    }

    /// 学期内の日付か（終了日未設定なら開始日以降すべて）
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.is_none_or(|end| date <= end)
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

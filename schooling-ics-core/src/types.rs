use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// 週末集中スクーリングを表すスケジュール表記
pub const WEEKEND_SCHEDULE_MARKER: &str = "土日";

/// 科目（カタログから渡される繰り返し定義）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// 科目コード
    pub code: String,
    /// 科目名
    pub name: String,
    /// 単位数
    pub credits: u32,
    /// 担当教員
    pub instructor: String,
    /// 学部（配色のキーにもなる）
    pub faculty: String,
    /// 夜間スクーリングの曜日 (monday..friday)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<String>,
    /// 週末スクーリングのスケジュール表記 ("土日")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

impl Course {
    /// 繰り返しの形を判定する。週末表記が優先され、どちらもなければ `None`
    pub fn recurrence(&self) -> Option<Recurrence> {
        if self.schedule.as_deref() == Some(WEEKEND_SCHEDULE_MARKER) {
            return Some(Recurrence::WeekendIntensive);
        }
        self.day_of_week
            .as_ref()
            .map(|day| Recurrence::Evening(day.clone()))
    }

    /// 選択画面で曜日の重複判定に使うキー
    pub fn schedule_key(&self) -> Option<&str> {
        self.day_of_week.as_deref().or(self.schedule.as_deref())
    }
}

/// 繰り返しの形
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    /// 平日夜間、毎週同じ曜日（曜日ラベルは未検証のまま保持）
    Evening(String),
    /// 3週連続の土日集中
    WeekendIntensive,
}

/// 夜間スクーリングが開講される曜日
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EveningDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl EveningDay {
    pub fn weekday(self) -> Weekday {
        match self {
            EveningDay::Monday => Weekday::Mon,
            EveningDay::Tuesday => Weekday::Tue,
            EveningDay::Wednesday => Weekday::Wed,
            EveningDay::Thursday => Weekday::Thu,
            EveningDay::Friday => Weekday::Fri,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EveningDay::Monday => "monday",
            EveningDay::Tuesday => "tuesday",
            EveningDay::Wednesday => "wednesday",
            EveningDay::Thursday => "thursday",
            EveningDay::Friday => "friday",
        }
    }
}

impl FromStr for EveningDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monday" => Ok(EveningDay::Monday),
            "tuesday" => Ok(EveningDay::Tuesday),
            "wednesday" => Ok(EveningDay::Wednesday),
            "thursday" => Ok(EveningDay::Thursday),
            "friday" => Ok(EveningDay::Friday),
            other => Err(format!("unsupported evening weekday: {}", other)),
        }
    }
}

impl fmt::Display for EveningDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// セッションの種別
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    #[default]
    Lecture,
    Seminar,
    Lab,
}

/// 生成された一回分の授業
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSession {
    pub id: String,
    pub course_code: String,
    pub course_name: String,
    pub professor: String,
    pub location: String,
    pub color: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    /// 0 = 日曜 .. 6 = 土曜
    pub day_of_week: u32,
    #[serde(rename = "type", default)]
    pub kind: SessionKind,
}

/// エクスポート前に表示する集計
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub total_sessions: usize,
    pub unique_courses: usize,
    /// 科目数 × 2 の概算値（実際の単位数は参照しない）
    pub total_credits_estimate: usize,
    pub date_range: Option<DateRange>,
}

/// 日付の範囲（両端を含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// ICS出力オプション
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IcsOptions {
    /// PRODID
    pub product_id: String,
    /// カレンダー名 (X-WR-CALNAME)
    pub calendar_name: String,
    /// X-WR-CALDESC
    pub calendar_description: String,
    /// 固定のタイムゾーン名
    pub timezone: String,
    /// タイムゾーンのUTCオフセット（分）
    pub utc_offset_minutes: i32,
    /// タイムゾーンの略称 (TZNAME)
    pub timezone_abbreviation: String,
    /// UIDのドメイン部分
    pub uid_domain: String,
    /// VTIMEZONE を出力するか
    pub include_vtimezone: bool,
    /// 75オクテットを超える行を折り返すか
    pub fold_lines: bool,
}

impl Default for IcsOptions {
    fn default() -> Self {
        Self {
            product_id: "-//Keio Course Planner//Keio Distance Learning//JA".to_string(),
            calendar_name: "慶應通信 コース予定".to_string(),
            calendar_description: "慶應義塾大学通信教育課程の選択科目スケジュール".to_string(),
            timezone: "Asia/Tokyo".to_string(),
            utc_offset_minutes: 9 * 60,
            timezone_abbreviation: "JST".to_string(),
            uid_domain: "keio-course-planner.local".to_string(),
            include_vtimezone: true,
            fold_lines: true,
        }
    }
}

/// `HH:MM` 形式で時刻をシリアライズする
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT)
            .map_err(|e| D::Error::custom(format!("invalid time '{}': {}", raw, e)))
    }
}

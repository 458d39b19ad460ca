use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use ical::parser::ical::{IcalParser, component::IcalEvent};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::{Error, Result};

/// 授業を行わない期間（両端を含む）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRange {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ExclusionRange {
    pub fn new(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    /// 年月日すべてで比較するので、年をまたぐ範囲でも別の年の同じ月日には一致しない
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// 除外日カレンダー
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionCalendar {
    ranges: Vec<ExclusionRange>,
}

impl ExclusionCalendar {
    pub fn new(ranges: Vec<ExclusionRange>) -> Self {
        Self { ranges }
    }

    /// 授業を置けない日か
    pub fn is_excluded(&self, date: NaiveDate) -> bool {
        self.matching_range(date).is_some()
    }

    /// 日付を除外している範囲
    pub fn matching_range(&self, date: NaiveDate) -> Option<&ExclusionRange> {
        self.ranges.iter().find(|range| range.contains(date))
    }

    pub fn ranges(&self) -> &[ExclusionRange] {
        &self.ranges
    }

    pub fn extend(&mut self, ranges: impl IntoIterator<Item = ExclusionRange>) {
        self.ranges.extend(ranges);
    }

    /// 休講日ICSをファイルから読み込む
    pub fn from_ics_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref).map_err(|err| {
            Error::Config(format!(
                "cannot open holiday ICS {}: {}",
                path_ref.display(),
                err
            ))
        })?;
        Self::from_ics_reader(file)
    }

    pub fn from_ics_bytes(bytes: impl AsRef<[u8]>) -> Result<Self> {
        let cursor = std::io::Cursor::new(bytes.as_ref());
        Self::from_ics_reader(cursor)
    }

    /// 各 VEVENT の DTSTART..DTEND（DTEND は含まない）を一つの範囲として読み込む
    pub fn from_ics_reader<R: Read>(reader: R) -> Result<Self> {
        let parser = IcalParser::new(BufReader::new(reader));
        let mut ranges = Vec::new();

        for calendar in parser {
            let calendar =
                calendar.map_err(|err| Error::Config(format!("holiday ICS parse failed: {}", err)))?;

            for event in calendar.events {
                let range = event_range(&event)?;
                tracing::debug!(
                    "loaded exclusion range {} ({} ..= {})",
                    range.label,
                    range.start,
                    range.end
                );
                ranges.push(range);
            }
        }

        Ok(Self::new(ranges))
    }
}

fn event_range(event: &IcalEvent) -> Result<ExclusionRange> {
    let start_raw = event_property(event, "DTSTART")
        .ok_or_else(|| Error::Config("holiday ICS event is missing DTSTART".to_string()))?;
    let start = parse_date(start_raw).map_err(|err| {
        Error::Config(format!("cannot parse holiday start {}: {}", start_raw, err))
    })?;

    let end = match event_property(event, "DTEND") {
        Some(value) => {
            let exclusive_end = parse_date(value).map_err(|err| {
                Error::Config(format!("cannot parse holiday end {}: {}", value, err))
            })?;
            if exclusive_end <= start {
                start
            } else {
                exclusive_end - Duration::days(1)
            }
        }
        None => start,
    };

    let label = event_property(event, "SUMMARY")
        .map(str::to_string)
        .unwrap_or_else(|| format!("holiday {}", start));

    Ok(ExclusionRange::new(label, start, end))
}

fn event_property<'a>(event: &'a IcalEvent, name: &str) -> Option<&'a str> {
    event
        .properties
        .iter()
        .find(|prop| prop.name.eq_ignore_ascii_case(name))
        .and_then(|prop| prop.value.as_deref())
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%SZ").map(|dt| dt.date()))
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::TermConfig;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn festival_week_is_inclusive() {
        let calendar = TermConfig::default().exclusion_calendar();

        assert!(!calendar.is_excluded(ymd(2025, 11, 18)));
        assert!(calendar.is_excluded(ymd(2025, 11, 19)));
        assert!(calendar.is_excluded(ymd(2025, 11, 21)));
        assert!(calendar.is_excluded(ymd(2025, 11, 24)));
        assert!(!calendar.is_excluded(ymd(2025, 11, 25)));
        assert_eq!(
            calendar.matching_range(ymd(2025, 11, 20)).map(|r| r.label.as_str()),
            Some("三田祭")
        );
    }

    #[test]
    fn winter_holiday_crosses_year_boundary() {
        let calendar = TermConfig::default().exclusion_calendar();

        assert!(!calendar.is_excluded(ymd(2025, 12, 28)));
        assert!(calendar.is_excluded(ymd(2025, 12, 29)));
        assert!(calendar.is_excluded(ymd(2025, 12, 31)));
        assert!(calendar.is_excluded(ymd(2026, 1, 1)));
        assert!(calendar.is_excluded(ymd(2026, 1, 5)));
        assert!(!calendar.is_excluded(ymd(2026, 1, 6)));
    }

    #[test]
    fn same_month_day_in_other_years_is_not_excluded() {
        let calendar = TermConfig::default().exclusion_calendar();

        assert!(!calendar.is_excluded(ymd(2024, 12, 30)));
        assert!(!calendar.is_excluded(ymd(2026, 12, 30)));
        assert!(!calendar.is_excluded(ymd(2025, 1, 3)));
        assert!(!calendar.is_excluded(ymd(2024, 11, 20)));
    }

    #[test]
    fn empty_calendar_excludes_nothing() {
        let calendar = ExclusionCalendar::default();
        assert!(!calendar.is_excluded(ymd(2025, 11, 20)));
        assert!(calendar.ranges().is_empty());
    }

    #[test]
    fn loads_all_day_events_from_ics() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:founding-day\r\n\
                   SUMMARY:創立記念日\r\n\
                   DTSTART;VALUE=DATE:20260123\r\n\
                   DTEND;VALUE=DATE:20260124\r\n\
                   END:VEVENT\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:exam-week\r\n\
                   SUMMARY:試験期間\r\n\
                   DTSTART;VALUE=DATE:20260126\r\n\
                   DTEND;VALUE=DATE:20260131\r\n\
                   END:VEVENT\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:single\r\n\
                   DTSTART;VALUE=DATE:20251103\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR\r\n";

        let calendar = ExclusionCalendar::from_ics_bytes(ics).unwrap();
        assert_eq!(calendar.ranges().len(), 3);

        assert!(calendar.is_excluded(ymd(2026, 1, 23)));
        assert!(!calendar.is_excluded(ymd(2026, 1, 24)));
        assert!(calendar.is_excluded(ymd(2026, 1, 26)));
        assert!(calendar.is_excluded(ymd(2026, 1, 30)));
        assert!(!calendar.is_excluded(ymd(2026, 1, 31)));
        assert!(calendar.is_excluded(ymd(2025, 11, 3)));
        assert_eq!(calendar.ranges()[2].label, "holiday 2025-11-03");
    }

    #[test]
    fn event_without_dtstart_is_rejected() {
        let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:壊れた\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let err = ExclusionCalendar::from_ics_bytes(ics).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn extend_merges_ranges() {
        let mut calendar = TermConfig::default().exclusion_calendar();
        calendar.extend([ExclusionRange::new("臨時休講", ymd(2025, 10, 13), ymd(2025, 10, 13))]);
        assert!(calendar.is_excluded(ymd(2025, 10, 13)));
        assert_eq!(calendar.ranges().len(), 3);
    }
}

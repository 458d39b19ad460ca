use std::collections::HashSet;

use crate::{CourseSession, DateRange, ExportSummary};

/// 単位数の概算に使う1科目あたりの単位数。実際の単位数は参照しない
pub const CREDITS_PER_COURSE_ESTIMATE: usize = 2;

/// エクスポート前の確認用に件数と期間を集計する
pub fn summarize(sessions: &[CourseSession]) -> ExportSummary {
    let unique_courses = sessions
        .iter()
        .map(|session| session.course_code.as_str())
        .collect::<HashSet<_>>()
        .len();

    let date_range = sessions
        .iter()
        .map(|session| session.date)
        .min()
        .zip(sessions.iter().map(|session| session.date).max())
        .map(|(start, end)| DateRange { start, end });

    ExportSummary {
        total_sessions: sessions.len(),
        unique_courses,
        total_credits_estimate: unique_courses * CREDITS_PER_COURSE_ESTIMATE,
        date_range,
    }
}

impl ExportSummary {
    /// ダウンロード前に表示する確認メッセージ
    pub fn confirmation_message(&self) -> String {
        let mut message = format!(
            "{}コース、{}セッションをエクスポートします（推定{}単位）",
            self.unique_courses, self.total_sessions, self.total_credits_estimate
        );
        if let Some(range) = self.date_range {
            message.push_str(&format!(
                "\n期間: {} 〜 {}",
                range.start.format("%Y-%m-%d"),
                range.end.format("%Y-%m-%d")
            ));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Course, schedule::generate_sessions, term::TermConfig};
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn courses() -> Vec<Course> {
        vec![
            Course {
                code: "62502".to_string(),
                name: "経済原論（マクロ経済学）".to_string(),
                credits: 2,
                instructor: "穂刈　享".to_string(),
                faculty: "経済学部".to_string(),
                day_of_week: Some("monday".to_string()),
                schedule: None,
            },
            Course {
                code: "52561".to_string(),
                name: "哲学（専門）".to_string(),
                credits: 4,
                instructor: "森　正樹/鈴木　優花".to_string(),
                faculty: "文学部".to_string(),
                day_of_week: None,
                schedule: Some("土日".to_string()),
            },
        ]
    }

    #[test]
    fn evening_plus_weekend_course() {
        let sessions = generate_sessions(&courses(), &TermConfig::default());
        let summary = summarize(&sessions);

        assert_eq!(summary.total_sessions, 18);
        assert_eq!(summary.unique_courses, 2);
        // 実際の単位数（2 + 4）ではなく科目数 × 2
        assert_eq!(summary.total_credits_estimate, 4);
        assert_eq!(
            summary.date_range,
            Some(DateRange {
                start: ymd(2025, 10, 6),
                end: ymd(2026, 1, 12),
            })
        );
    }

    #[test]
    fn date_range_spans_all_courses_regardless_of_order() {
        let mut sessions = generate_sessions(&courses(), &TermConfig::default());
        sessions.reverse();
        let range = summarize(&sessions).date_range.unwrap();
        assert_eq!(range.start, ymd(2025, 10, 6));
        assert_eq!(range.end, ymd(2026, 1, 12));
    }

    #[test]
    fn empty_input() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_sessions, 0);
        assert_eq!(summary.unique_courses, 0);
        assert_eq!(summary.total_credits_estimate, 0);
        assert_eq!(summary.date_range, None);
        assert!(!summary.confirmation_message().contains("期間"));
    }

    #[test]
    fn confirmation_message_lists_counts_and_span() {
        let sessions = generate_sessions(&courses(), &TermConfig::default());
        let message = summarize(&sessions).confirmation_message();
        assert!(message.contains("2コース、18セッション"));
        assert!(message.contains("推定4単位"));
        assert!(message.contains("期間: 2025-10-06 〜 2026-01-12"));
    }
}

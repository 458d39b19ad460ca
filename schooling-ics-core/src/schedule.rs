//! 科目の繰り返し定義から日付つきのセッションを展開する

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate};

use crate::{
    Course, CourseSession, EveningDay, Recurrence, SessionKind,
    exclusion::ExclusionCalendar,
    term::{TermConfig, TimeSlot},
};

/// 学部ごとの表示色
pub fn faculty_color(faculty: &str) -> &'static str {
    match faculty {
        "総合" => "#3B82F6",
        "文学部" => "#10B981",
        "経済学部" => "#8B5CF6",
        "法学部" => "#F59E0B",
        "教職" => "#EF4444",
        _ => "#6B7280",
    }
}

/// 夜間スクーリング（毎週同じ曜日、既定12回）のセッションを生成する
///
/// 曜日が解釈できない場合は空を返す。除外日に当たった週は回数に数えずに
/// 翌週へ進む。規定回数に届く前に次のどちらかに達すると、その時点までの
/// セッションを返す。
///
/// - 学期終了日 (`end_date`) を過ぎた
/// - `evening_candidate_limit` 週分を調べ終えた
pub fn generate_evening_sessions(
    code: &str,
    name: &str,
    instructor: &str,
    day_of_week: &str,
    color: &str,
    term: &TermConfig,
) -> Vec<CourseSession> {
    let mut sessions = Vec::new();

    let Ok(day) = day_of_week.parse::<EveningDay>() else {
        tracing::debug!("course {} has unmapped weekday '{}'", code, day_of_week);
        return sessions;
    };

    let Some(anchor) = first_on_or_after(term.start_date, day) else {
        return sessions;
    };
    let exclusions = term.exclusion_calendar();
    let target = term.evening_sessions as usize;

    for week in 0..=term.evening_candidate_limit {
        if sessions.len() >= target {
            break;
        }

        let Some(candidate) = anchor.checked_add_signed(Duration::weeks(i64::from(week))) else {
            break;
        };
        if term.end_date.is_some_and(|end| candidate > end) {
            tracing::debug!("course {} reached term end at {}", code, candidate);
            break;
        }

        if is_skipped(&exclusions, candidate, code) {
            continue;
        }

        let index = sessions.len() + 1;
        sessions.push(build_session(
            format!("{}-{}", code, index),
            code,
            name,
            instructor,
            &term.location,
            color,
            candidate,
            term.evening,
        ));
    }

    if sessions.len() < target {
        tracing::warn!(
            "course {} produced only {} of {} evening sessions",
            code,
            sessions.len(),
            target
        );
    }

    sessions
}

/// 週末集中スクーリング（3週連続の土曜午後＋日曜午前）のセッションを生成する
///
/// 除外日は参照しない。週末ブロックは除外期間と重ならない前提で学期設定を組むこと。
pub fn generate_weekend_sessions(
    code: &str,
    name: &str,
    instructor: &str,
    color: &str,
    term: &TermConfig,
) -> Vec<CourseSession> {
    let mut sessions = Vec::new();

    for week in 0..term.weekend_count {
        let Some(saturday) = term
            .weekend_anchor
            .checked_add_signed(Duration::weeks(i64::from(week)))
        else {
            break;
        };
        let Some(sunday) = saturday.succ_opt() else {
            break;
        };

        sessions.push(build_session(
            format!("{}-sat-{}", code, week + 1),
            code,
            name,
            instructor,
            &term.location,
            color,
            saturday,
            term.weekend_saturday,
        ));
        sessions.push(build_session(
            format!("{}-sun-{}", code, week + 1),
            code,
            name,
            instructor,
            &term.location,
            color,
            sunday,
            term.weekend_sunday,
        ));
    }

    sessions
}

/// 科目一つ分のセッション。繰り返しの形がなければ空
pub fn generate_course_sessions(course: &Course, term: &TermConfig) -> Vec<CourseSession> {
    let color = faculty_color(&course.faculty);
    match course.recurrence() {
        Some(Recurrence::Evening(day)) => generate_evening_sessions(
            &course.code,
            &course.name,
            &course.instructor,
            &day,
            color,
            term,
        ),
        Some(Recurrence::WeekendIntensive) => generate_weekend_sessions(
            &course.code,
            &course.name,
            &course.instructor,
            color,
            term,
        ),
        None => {
            tracing::debug!("course {} has no recurrence, skipping", course.code);
            Vec::new()
        }
    }
}

/// 選択された科目すべてのセッションを入力順に連結する
///
/// 同じ科目コードが重複していれば最初の一件だけを使う。
pub fn generate_sessions(courses: &[Course], term: &TermConfig) -> Vec<CourseSession> {
    let mut seen = HashSet::new();
    courses
        .iter()
        .filter(|course| {
            let first = seen.insert(course.code.as_str());
            if !first {
                tracing::debug!("course {} selected twice, ignoring duplicate", course.code);
            }
            first
        })
        .flat_map(|course| generate_course_sessions(course, term))
        .collect()
}

/// 同じ曜日（または同じ週末枠）に別の科目が入っているか
pub fn courses_conflict(a: &Course, b: &Course) -> bool {
    if a.code == b.code {
        return false;
    }
    matches!((a.schedule_key(), b.schedule_key()), (Some(x), Some(y)) if x == y)
}

/// 選択済みの科目のうち、候補と衝突する最初のもの
pub fn find_conflict<'a>(candidate: &Course, selected: &'a [Course]) -> Option<&'a Course> {
    selected
        .iter()
        .find(|course| courses_conflict(candidate, course))
}

fn first_on_or_after(start: NaiveDate, day: EveningDay) -> Option<NaiveDate> {
    let target = day.weekday().num_days_from_sunday();
    let current = start.weekday().num_days_from_sunday();
    let offset = (target + 7 - current) % 7;
    start.checked_add_signed(Duration::days(i64::from(offset)))
}

fn is_skipped(exclusions: &ExclusionCalendar, date: NaiveDate, code: &str) -> bool {
    match exclusions.matching_range(date) {
        Some(range) => {
            tracing::debug!("course {} skips {} ({})", code, date, range.label);
            true
        }
        None => false,
    }
}

#[allow(clippy::too_many_arguments)]
fn build_session(
    id: String,
    code: &str,
    name: &str,
    instructor: &str,
    location: &str,
    color: &str,
    date: NaiveDate,
    slot: TimeSlot,
) -> CourseSession {
    CourseSession {
        id,
        course_code: code.to_string(),
        course_name: name.to_string(),
        professor: instructor.to_string(),
        location: location.to_string(),
        color: color.to_string(),
        date,
        start_time: slot.start,
        end_time: slot.end,
        day_of_week: date.weekday().num_days_from_sunday(),
        kind: SessionKind::Lecture,
    }
}

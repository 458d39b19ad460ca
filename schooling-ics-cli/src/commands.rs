use std::fs;

use anyhow::Result;
use chrono::Local;
use schooling_ics_core::prelude::*;

use crate::{OutputFormat, SelectionArgs};

/// ICS生成コマンドの引数
pub struct GenerateParams {
    pub selection: SelectionArgs,
    pub output: Option<String>,
    pub calendar_name: Option<String>,
    pub fold_lines: bool,
    pub dry_run: bool,
}

/// 選択された科目と学期設定
struct Selection {
    courses: Vec<Course>,
    term: TermConfig,
}

fn load_term(path: Option<&str>) -> Result<TermConfig> {
    match path {
        Some(path) => {
            tracing::info!("学期設定を読み込み: {}", path);
            Ok(TermConfig::from_path(path)?)
        }
        None => Ok(TermConfig::default()),
    }
}

fn load_selection(args: &SelectionArgs) -> Result<Selection> {
    let catalog = CourseCatalog::from_path(&args.courses)?;
    let courses = if args.codes.is_empty() {
        catalog.courses().to_vec()
    } else {
        catalog.select(&args.codes)?
    };

    let mut term = load_term(args.term.as_deref())?;
    if let Some(ref path) = args.holiday_ics {
        let holidays = ExclusionCalendar::from_ics_path(path)?;
        tracing::info!("休講日ICSから {} 件の期間を追加: {}", holidays.ranges().len(), path);
        term.exclusions.extend(holidays.ranges().iter().cloned());
    }

    tracing::info!(
        "対象科目 {} 件（カタログ {} 件）",
        courses.len(),
        catalog.courses().len()
    );

    Ok(Selection { courses, term })
}

/// セッション一覧コマンド
pub fn sessions_command(args: &SelectionArgs, format: OutputFormat) -> Result<()> {
    let selection = load_selection(args)?;
    let sessions = generate_sessions(&selection.courses, &selection.term);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        OutputFormat::Table => {
            for session in &sessions {
                println!(
                    "{:<14} {} ({}) {}-{}  {}",
                    session.id,
                    session.date.format("%Y-%m-%d"),
                    weekday_label(session.day_of_week),
                    session.start_time.format("%H:%M"),
                    session.end_time.format("%H:%M"),
                    session.course_name
                );
            }
            println!("合計 {} セッション", sessions.len());
        }
    }

    Ok(())
}

/// 集計コマンド
pub fn summary_command(args: &SelectionArgs) -> Result<()> {
    let selection = load_selection(args)?;
    let sessions = generate_sessions(&selection.courses, &selection.term);
    println!("{}", summarize(&sessions).confirmation_message());
    Ok(())
}

/// ICS生成コマンド
pub fn generate_command(params: GenerateParams) -> Result<()> {
    let selection = load_selection(&params.selection)?;

    if let Some((a, b)) = first_conflict(&selection.courses) {
        println!(
            "⚠ 同じ曜日に「{}」と「{}」が選択されています",
            a.name, b.name
        );
    }

    let sessions = generate_sessions(&selection.courses, &selection.term);
    let summary = summarize(&sessions);
    println!("{}", summary.confirmation_message());

    if params.dry_run {
        println!("--dry-run のため書き出しません");
        return Ok(());
    }

    let mut options = IcsOptions {
        fold_lines: params.fold_lines,
        ..Default::default()
    };
    if let Some(name) = params.calendar_name {
        options.calendar_name = name;
    }

    let generator = IcsGenerator::new(options);
    let ics_content = generator.render(&sessions);

    let output_file = params
        .output
        .unwrap_or_else(|| export_filename(Local::now().date_naive()));

    fs::write(&output_file, ics_content)?;
    println!("✓ ICSファイルを保存しました: {}", output_file);

    Ok(())
}

/// 曜日重複の確認コマンド
pub fn conflicts_command(args: &SelectionArgs) -> Result<()> {
    let selection = load_selection(args)?;
    let mut found = 0;

    for (index, course) in selection.courses.iter().enumerate() {
        let earlier = &selection.courses[..index];
        if let Some(other) = find_conflict(course, earlier) {
            found += 1;
            println!(
                "{} {} と {} {} が同じ枠 ({}) です",
                other.code,
                other.name,
                course.code,
                course.name,
                course.schedule_key().unwrap_or_default()
            );
        }
    }

    if found == 0 {
        println!("重複はありません");
    }

    Ok(())
}

/// 学期設定表示コマンド
pub fn term_command(path: Option<&str>) -> Result<()> {
    let term = load_term(path)?;
    println!("{}", term.to_json_pretty()?);
    Ok(())
}

fn first_conflict(courses: &[Course]) -> Option<(&Course, &Course)> {
    courses.iter().enumerate().find_map(|(index, course)| {
        find_conflict(course, &courses[..index]).map(|other| (other, course))
    })
}

fn weekday_label(day_of_week: u32) -> &'static str {
    match day_of_week {
        0 => "日",
        1 => "月",
        2 => "火",
        3 => "水",
        4 => "木",
        5 => "金",
        _ => "土",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(code: &str, day: Option<&str>, schedule: Option<&str>) -> Course {
        Course {
            code: code.to_string(),
            name: format!("科目{}", code),
            credits: 2,
            instructor: "教員".to_string(),
            faculty: "文学部".to_string(),
            day_of_week: day.map(str::to_string),
            schedule: schedule.map(str::to_string),
        }
    }

    #[test]
    fn first_conflict_reports_earlier_course_first() {
        let courses = vec![
            course("52545", Some("thursday"), None),
            course("52561", None, Some("土日")),
            course("62515", None, Some("土日")),
        ];
        let (a, b) = first_conflict(&courses).unwrap();
        assert_eq!(a.code, "52561");
        assert_eq!(b.code, "62515");

        assert!(first_conflict(&courses[..2]).is_none());
    }

    #[test]
    fn weekday_labels_start_on_sunday() {
        assert_eq!(weekday_label(0), "日");
        assert_eq!(weekday_label(1), "月");
        assert_eq!(weekday_label(6), "土");
    }
}

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::{CourseSession, IcsOptions};


/// ダウンロード時の MIME タイプ
pub const ICS_MIME_TYPE: &str = "text/calendar; charset=utf-8";

/// RFC 5545 の1行あたりの上限（オクテット、CRLFを除く）
const MAX_LINE_OCTETS: usize = 75;

/// エクスポートファイル名 (`keio-courses-YYYY-MM-DD.ics`)
pub fn export_filename(date: NaiveDate) -> String {
    format!("keio-courses-{}.ics", date.format("%Y-%m-%d"))
}

/// 科目コードの先頭の数字から分類名を決める
pub fn category_for_code(course_code: &str) -> &'static str {
    match course_code.chars().next() {
        Some('1') => "総合教育科目",
        Some('2') => "外国語科目",
        Some('5') => "文学部",
        Some('6') => "経済学部",
        Some('7') => "法学部",
        _ => "専門科目",
    }
}

/// ICSカレンダー生成器
pub struct IcsGenerator {
    options: IcsOptions,
}

impl IcsGenerator {
    pub fn new(options: IcsOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &IcsOptions {
        &self.options
    }

    /// 現在時刻を DTSTAMP にして出力する
    pub fn render(&self, sessions: &[CourseSession]) -> String {
        self.render_at(sessions, Utc::now())
    }

    /// 指定した生成時刻で出力する。セッションは入力順のまま並べる
    pub fn render_at(&self, sessions: &[CourseSession], generated_at: DateTime<Utc>) -> String {
        let mut ics_content = String::new();
        let dtstamp = generated_at.format("%Y%m%dT%H%M%SZ").to_string();

        // ヘッダー
        self.push_line(&mut ics_content, "BEGIN:VCALENDAR");
        self.push_line(&mut ics_content, "VERSION:2.0");
        self.push_line(
            &mut ics_content,
            &format!("PRODID:{}", self.options.product_id),
        );
        self.push_line(&mut ics_content, "CALSCALE:GREGORIAN");
        self.push_line(&mut ics_content, "METHOD:PUBLISH");
        self.push_line(
            &mut ics_content,
            &format!("X-WR-CALNAME:{}", escape_text(&self.options.calendar_name)),
        );
        self.push_line(
            &mut ics_content,
            &format!(
                "X-WR-CALDESC:{}",
                escape_text(&self.options.calendar_description)
            ),
        );
        self.push_line(
            &mut ics_content,
            &format!("X-WR-TIMEZONE:{}", self.options.timezone),
        );

        if self.options.include_vtimezone {
            self.add_timezone(&mut ics_content);
        }

        for session in sessions {
            self.add_session_event(&mut ics_content, session, &dtstamp);
        }

        // フッター
        self.push_line(&mut ics_content, "END:VCALENDAR");

        tracing::debug!(
            "rendered {} events ({} bytes)",
            sessions.len(),
            ics_content.len()
        );

        ics_content
    }

    /// 固定オフセットのみの VTIMEZONE
    fn add_timezone(&self, ics_content: &mut String) {
        let offset = format_utc_offset(self.options.utc_offset_minutes);

        self.push_line(ics_content, "BEGIN:VTIMEZONE");
        self.push_line(ics_content, &format!("TZID:{}", self.options.timezone));
        self.push_line(ics_content, "BEGIN:STANDARD");
        self.push_line(ics_content, "DTSTART:19700101T000000");
        self.push_line(ics_content, &format!("TZOFFSETFROM:{}", offset));
        self.push_line(ics_content, &format!("TZOFFSETTO:{}", offset));
        self.push_line(
            ics_content,
            &format!("TZNAME:{}", self.options.timezone_abbreviation),
        );
        self.push_line(ics_content, "END:STANDARD");
        self.push_line(ics_content, "END:VTIMEZONE");
    }

    /// セッション一件分の VEVENT
    fn add_session_event(&self, ics_content: &mut String, session: &CourseSession, dtstamp: &str) {
        let tzid = &self.options.timezone;
        let dtstart = format_local(session.date, session.start_time);
        let dtend = format_local(session.date, session.end_time);

        self.push_line(ics_content, "BEGIN:VEVENT");
        self.push_line(
            ics_content,
            &format!("UID:{}@{}", session.id, self.options.uid_domain),
        );
        self.push_line(ics_content, &format!("DTSTAMP:{}", dtstamp));
        self.push_line(ics_content, &format!("DTSTART;TZID={}:{}", tzid, dtstart));
        self.push_line(ics_content, &format!("DTEND;TZID={}:{}", tzid, dtend));
        self.push_line(
            ics_content,
            &format!("SUMMARY:{}", escape_text(&session.course_name)),
        );
        self.push_line(
            ics_content,
            &format!(
                "DESCRIPTION:{}",
                escape_text(&build_session_description(session))
            ),
        );
        self.push_line(
            ics_content,
            &format!("LOCATION:{}", escape_text(&session.location)),
        );
        self.push_line(
            ics_content,
            &format!("CATEGORIES:{}", category_for_code(&session.course_code)),
        );
        self.push_line(ics_content, "STATUS:CONFIRMED");
        self.push_line(ics_content, "TRANSP:OPAQUE");
        self.push_line(ics_content, "END:VEVENT");
    }

    fn push_line(&self, ics_content: &mut String, line: &str) {
        if self.options.fold_lines {
            ics_content.push_str(&fold_line(line));
        } else {
            ics_content.push_str(line);
        }
        ics_content.push_str("\r\n");
    }
}

impl Default for IcsGenerator {
    fn default() -> Self {
        Self::new(IcsOptions::default())
    }
}

/// 説明欄（コード・講師・場所を改行区切り、エスケープ前）
pub fn build_session_description(session: &CourseSession) -> String {
    format!(
        "コード: {}\n講師: {}\n場所: {}",
        session.course_code, session.professor, session.location
    )
}

/// TEXT値のエスケープ（バックスラッシュ・改行・カンマ・セミコロン）
pub fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// 75オクテットを超える行を CRLF + 空白で折り返す。マルチバイト文字の途中では切らない
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut folded = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    // 継続行は先頭の空白で1オクテット使う
    let mut limit = MAX_LINE_OCTETS;
    let mut current = 0;

    for ch in line.chars() {
        let width = ch.len_utf8();
        if current + width > limit {
            folded.push_str("\r\n ");
            limit = MAX_LINE_OCTETS - 1;
            current = 0;
        }
        folded.push(ch);
        current += width;
    }

    folded
}

fn format_local(date: NaiveDate, time: NaiveTime) -> String {
    date.and_time(time).format("%Y%m%dT%H%M%S").to_string()
}

fn format_utc_offset(minutes: i32) -> String {
    let sign = if minutes < 0 { '-' } else { '+' };
    let abs = minutes.unsigned_abs();
    format!("{}{:02}{:02}", sign, abs / 60, abs % 60)
}

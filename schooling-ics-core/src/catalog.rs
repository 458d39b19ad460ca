use std::{collections::BTreeSet, fs, path::Path};

use serde::Deserialize;

use crate::{Course, Error, Result};

/// 科目カタログ
#[derive(Debug, Clone, Default)]
pub struct CourseCatalog {
    courses: Vec<Course>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    // Grouped は配列にも一致するので Flat を先に置く
    Flat(Vec<Course>),
    Grouped {
        #[serde(default)]
        evening_courses: CourseGroup,
        #[serde(default)]
        weekend_courses: CourseGroup,
    },
}

#[derive(Deserialize, Default)]
struct CourseGroup {
    #[serde(default)]
    courses: Vec<Course>,
}

impl CourseCatalog {
    pub fn new(courses: Vec<Course>) -> Self {
        Self { courses }
    }

    /// JSONから読み込む。夜間・週末のグループ形式と科目の配列のどちらでもよい
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::from_file(serde_json::from_str(json)?))
    }

    /// YAMLから読み込む。形式は `from_json` と同じ
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(Self::from_file(serde_yaml::from_str(yaml)?))
    }

    /// 拡張子が `.yaml` / `.yml` ならYAML、それ以外はJSONとして読む
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = fs::read_to_string(path_ref).map_err(|err| {
            Error::Config(format!(
                "cannot read course catalog {}: {}",
                path_ref.display(),
                err
            ))
        })?;

        let is_yaml = path_ref
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml")
            });

        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    fn from_file(file: CatalogFile) -> Self {
        let courses: Vec<Course> = match file {
            CatalogFile::Flat(courses) => courses,
            CatalogFile::Grouped {
                evening_courses,
                weekend_courses,
            } => evening_courses
                .courses
                .into_iter()
                .chain(weekend_courses.courses)
                .collect(),
        };
        tracing::debug!("loaded {} courses", courses.len());
        Self { courses }
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn find(&self, code: &str) -> Option<&Course> {
        self.courses.iter().find(|course| course.code == code)
    }

    /// 指定コードの科目を指定順で取り出す。見つからないコードがあればエラー
    pub fn select<S: AsRef<str>>(&self, codes: &[S]) -> Result<Vec<Course>> {
        codes
            .iter()
            .map(|code| {
                let code = code.as_ref();
                self.find(code)
                    .cloned()
                    .ok_or_else(|| Error::Config(format!("unknown course code: {}", code)))
            })
            .collect()
    }

    pub fn by_faculty(&self, faculty: &str) -> Vec<&Course> {
        self.courses
            .iter()
            .filter(|course| course.faculty == faculty)
            .collect()
    }

    /// 曜日ラベルまたは "土日" で絞り込む
    pub fn by_schedule(&self, key: &str) -> Vec<&Course> {
        self.courses
            .iter()
            .filter(|course| course.schedule_key() == Some(key))
            .collect()
    }

    pub fn faculties(&self) -> BTreeSet<&str> {
        self.courses
            .iter()
            .map(|course| course.faculty.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUPED: &str = r#"{
        "evening_courses": {
            "schedule_info": { "time": "18:20-20:05" },
            "courses": [
                { "code": "62502", "name": "経済原論（マクロ経済学）", "credits": 2,
                  "instructor": "穂刈　享", "faculty": "経済学部", "day_of_week": "monday" },
                { "code": "72540", "name": "日本政治論", "credits": 2,
                  "instructor": "松浦　淳介/姜　兌ゆん", "faculty": "法学部", "day_of_week": "wednesday" }
            ]
        },
        "weekend_courses": {
            "courses": [
                { "code": "52561", "name": "哲学（専門）", "credits": 2,
                  "instructor": "森　正樹/鈴木　優花", "faculty": "文学部", "schedule": "土日" }
            ]
        }
    }"#;

    #[test]
    fn loads_grouped_catalog() {
        let catalog = CourseCatalog::from_json(GROUPED).unwrap();
        assert_eq!(catalog.courses().len(), 3);
        assert_eq!(catalog.courses()[2].code, "52561");
        assert_eq!(catalog.by_schedule("土日").len(), 1);
        assert_eq!(catalog.by_schedule("monday").len(), 1);
        assert_eq!(catalog.by_faculty("法学部")[0].code, "72540");
        assert_eq!(
            catalog.faculties().into_iter().collect::<Vec<_>>(),
            vec!["文学部", "法学部", "経済学部"]
        );
    }

    #[test]
    fn loads_flat_catalog() {
        let catalog = CourseCatalog::from_json(
            r#"[{ "code": "62515", "name": "経済学史", "credits": 2,
                  "instructor": "穂刈　享", "faculty": "経済学部", "schedule": "土日" }]"#,
        )
        .unwrap();
        assert_eq!(catalog.find("62515").map(|c| c.name.as_str()), Some("経済学史"));
    }

    #[test]
    fn select_keeps_requested_order() {
        let catalog = CourseCatalog::from_json(GROUPED).unwrap();
        let selected = catalog.select(&["52561", "62502"]).unwrap();
        let codes: Vec<_> = selected.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["52561", "62502"]);
    }

    #[test]
    fn select_rejects_unknown_code() {
        let catalog = CourseCatalog::from_json(GROUPED).unwrap();
        let err = catalog.select(&["00000"]).unwrap_err();
        assert!(err.to_string().contains("00000"));
    }

    const GROUPED_YAML: &str = r#"
evening_courses:
  schedule_info:
    duration: "12回"
    period: "10月〜1月"
  courses:
    - code: "62502"
      name: "経済原論（マクロ経済学）"
      credits: 2
      instructor: "穂刈　享"
      faculty: "経済学部"
      day_of_week: "monday"
weekend_courses:
  courses:
    - code: "52561"
      name: "哲学（専門）"
      credits: 2
      instructor: "森　正樹/鈴木　優花"
      faculty: "文学部"
      schedule: "土日"
"#;

    #[test]
    fn loads_grouped_yaml_catalog() {
        let catalog = CourseCatalog::from_yaml(GROUPED_YAML).unwrap();
        let codes: Vec<_> = catalog.courses().iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["62502", "52561"]);
        assert_eq!(catalog.courses()[0].day_of_week.as_deref(), Some("monday"));
        assert_eq!(catalog.courses()[1].schedule.as_deref(), Some("土日"));
    }

    #[test]
    fn from_path_picks_format_by_extension() {
        let dir = std::env::temp_dir()
            .join(format!("schooling-ics-catalog-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let yaml_path = dir.join("courses.yaml");
        fs::write(&yaml_path, GROUPED_YAML).unwrap();
        assert_eq!(CourseCatalog::from_path(&yaml_path).unwrap().courses().len(), 2);

        let yml_path = dir.join("courses.yml");
        fs::write(&yml_path, GROUPED_YAML).unwrap();
        assert_eq!(CourseCatalog::from_path(&yml_path).unwrap().courses().len(), 2);

        let json_path = dir.join("courses.json");
        fs::write(&json_path, GROUPED).unwrap();
        assert_eq!(CourseCatalog::from_path(&json_path).unwrap().courses().len(), 3);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(matches!(
            CourseCatalog::from_yaml("evening_courses: [unclosed"),
            Err(Error::Yaml(_))
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            CourseCatalog::from_json("{ not json"),
            Err(Error::Json(_))
        ));
    }
}

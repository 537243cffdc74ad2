//! 用户资料
//!
//! 批量运行期间只读。结构对应 `data/user_profile.json`：
//! `personal_information`、`work_experience`、`education`、`skills`。

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::models::{FieldDescriptor, FillValue};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub personal_information: PersonalInformation,
    #[serde(default)]
    pub work_experience: Vec<WorkExperience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    /// 简历文件，用于上传字段
    #[serde(default)]
    pub resume_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInformation {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub preferred_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address_line_1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub linkedin: Option<String>,
    pub website: Option<String>,
    /// 其它自由字段（签证状态、期望薪资等），只提供给模型参考
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkExperience {
    pub company: String,
    pub position: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    pub field_of_study: Option<String>,
    pub graduation_date: Option<String>,
}

/// 页面上可以重复添加的资料段（"Add" / "Add Another"）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSection {
    WorkExperience,
    Education,
}

impl ProfileSection {
    pub fn name(self) -> &'static str {
        match self {
            ProfileSection::WorkExperience => "work_experience",
            ProfileSection::Education => "education",
        }
    }
}

/// 字段所在的面板：第 `index` 段经历 / 教育（从 0 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryRef {
    pub section: ProfileSection,
    pub index: usize,
}

/// 可以从资料中直接取值的键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKey {
    FirstName,
    LastName,
    PreferredName,
    FullName,
    Email,
    Phone,
    AddressLine1,
    City,
    State,
    PostalCode,
    Country,
    LinkedIn,
    Website,
    CurrentCompany,
    CurrentTitle,
    /// 以下四个只在经历面板内取值
    JobStartDate,
    JobEndDate,
    JobDescription,
    School,
    Degree,
    FieldOfStudy,
    /// 只在教育面板内取值
    GraduationDate,
    Skills,
    Resume,
}

impl UserProfile {
    /// 某一段资料的条目数
    pub fn entry_count(&self, section: ProfileSection) -> usize {
        match section {
            ProfileSection::WorkExperience => self.work_experience.len(),
            ProfileSection::Education => self.education.len(),
        }
    }

    /// 按键取值，资料里没有时返回 `None`
    ///
    /// 经历 / 教育类的键按 `entry` 指向的那一段取值；字段不在面板里时取第一段，
    /// 日期和描述这类只在面板里才有意义的键不取值。
    pub fn lookup(&self, key: ProfileKey, entry: Option<EntryRef>) -> Option<FillValue> {
        let info = &self.personal_information;
        let index_in = |section: ProfileSection| match entry {
            Some(e) if e.section == section => Some(e.index),
            Some(_) => None,
            None => Some(0),
        };
        let in_panel = |section: ProfileSection| entry.filter(|e| e.section == section).map(|e| e.index);
        let work = |index: Option<usize>| index.and_then(|i| self.work_experience.get(i));
        let school = |index: Option<usize>| index.and_then(|i| self.education.get(i));
        let text = |v: &Option<String>| {
            v.as_ref()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| FillValue::Text(s.to_string()))
        };
        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| FillValue::Text(s.trim().to_string()));

        match key {
            ProfileKey::FirstName => text(&info.first_name),
            ProfileKey::LastName => text(&info.last_name),
            ProfileKey::PreferredName => text(&info.preferred_name),
            ProfileKey::FullName => {
                let parts: Vec<&str> = [&info.first_name, &info.last_name]
                    .into_iter()
                    .filter_map(|p| p.as_deref())
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .collect();
                non_empty(&parts.join(" "))
            }
            ProfileKey::Email => text(&info.email),
            ProfileKey::Phone => text(&info.phone),
            ProfileKey::AddressLine1 => text(&info.address_line_1),
            ProfileKey::City => text(&info.city),
            ProfileKey::State => text(&info.state),
            ProfileKey::PostalCode => text(&info.postal_code),
            ProfileKey::Country => text(&info.country),
            ProfileKey::LinkedIn => text(&info.linkedin),
            ProfileKey::Website => text(&info.website),
            ProfileKey::CurrentCompany => {
                work(index_in(ProfileSection::WorkExperience)).and_then(|w| non_empty(&w.company))
            }
            ProfileKey::CurrentTitle => {
                work(index_in(ProfileSection::WorkExperience)).and_then(|w| non_empty(&w.position))
            }
            ProfileKey::JobStartDate => work(in_panel(ProfileSection::WorkExperience)).and_then(|w| text(&w.start_date)),
            ProfileKey::JobEndDate => work(in_panel(ProfileSection::WorkExperience)).and_then(|w| text(&w.end_date)),
            ProfileKey::JobDescription => {
                work(in_panel(ProfileSection::WorkExperience)).and_then(|w| text(&w.description))
            }
            ProfileKey::School => school(index_in(ProfileSection::Education)).and_then(|e| non_empty(&e.institution)),
            ProfileKey::Degree => school(index_in(ProfileSection::Education)).and_then(|e| non_empty(&e.degree)),
            ProfileKey::FieldOfStudy => {
                school(index_in(ProfileSection::Education)).and_then(|e| text(&e.field_of_study))
            }
            ProfileKey::GraduationDate => {
                school(in_panel(ProfileSection::Education)).and_then(|e| text(&e.graduation_date))
            }
            ProfileKey::Skills => {
                let skills: Vec<&str> = self.skills.iter().map(String::as_str).collect();
                non_empty(&skills.join(", "))
            }
            ProfileKey::Resume => self.resume_path.clone().map(FillValue::File),
        }
    }
}

/// 交给模型的资料片段
///
/// 只带和字段相关的部分，减少提示词长度。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileContext {
    pub sections: JsonValue,
}

impl ProfileContext {
    pub fn for_field(profile: &UserProfile, field: &FieldDescriptor) -> Self {
        if let Some(entry) = field.entry {
            let sections = match entry.section {
                ProfileSection::WorkExperience => json!({ "work_experience": profile.work_experience.get(entry.index) }),
                ProfileSection::Education => json!({ "education": profile.education.get(entry.index) }),
            };
            return Self { sections };
        }

        let label = field.label.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| label.contains(w));

        let sections = if mentions(&["employer", "company", "work", "experience", "position", "job title"]) {
            json!({ "work_experience": profile.work_experience })
        } else if mentions(&["school", "university", "degree", "education", "study", "gpa"]) {
            json!({ "education": profile.education })
        } else if mentions(&["skill", "technolog", "tool", "language", "competenc", "certification"]) {
            json!({ "skills": profile.skills })
        } else {
            json!({
                "personal_information": profile.personal_information,
                "work_experience": profile.work_experience.first(),
                "education": profile.education.first(),
            })
        };
        Self { sections }
    }

    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string(&self.sections).unwrap_or_else(|_| "{}".to_string())
    }
}

use crate::models::UserProfile;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 加载用户资料，`.toml` 按 TOML 解析，其余按 JSON 解析
pub async fn load_profile(path: &Path) -> Result<UserProfile> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取用户资料: {}", path.display()))?;

    let profile: UserProfile = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
        toml::from_str(&content).with_context(|| format!("无法解析用户资料: {}", path.display()))?
    } else {
        serde_json::from_str(&content).with_context(|| format!("无法解析用户资料: {}", path.display()))?
    };

    tracing::info!(
        "已加载用户资料: {} 段工作经历, {} 段教育经历, {} 项技能",
        profile.work_experience.len(),
        profile.education.len(),
        profile.skills.len()
    );

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_toml_profile() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
skills = ["Rust"]

[personal_information]
first_name = "Jane"

[[education]]
institution = "State University"
degree = "BS"
"#
        )
        .unwrap();

        let profile = load_profile(file.path()).await.unwrap();
        assert_eq!(profile.personal_information.first_name.as_deref(), Some("Jane"));
        assert_eq!(profile.education[0].degree, "BS");
        assert!(profile.skills.contains("Rust"));
    }

    #[test]
    fn test_load_json_profile() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"personal_information": {{"email": "jane@example.com"}}, "skills": ["SQL"]}}"#
        )
        .unwrap();

        let profile = tokio_test::block_on(load_profile(file.path())).unwrap();
        assert_eq!(profile.personal_information.email.as_deref(), Some("jane@example.com"));
        assert!(profile.work_experience.is_empty());
    }

    #[test]
    fn test_invalid_profile_is_error() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "not json").unwrap();
        tokio_test::assert_err!(tokio_test::block_on(load_profile(file.path())));
    }
}

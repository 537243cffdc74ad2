use serde::{Deserialize, Serialize};

/// 待投递的岗位
///
/// 批量开始时从岗位列表读出，之后不可变，只会被一条流程消费一次。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTarget {
    /// 在岗位列表中的序号（从 1 开始）
    pub index: usize,
    pub url: String,
    /// 公司标识，用于日志和落盘文件名
    pub company_label: String,
}

impl JobTarget {
    pub fn new(index: usize, url: impl Into<String>, company_label: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
            company_label: company_label.into(),
        }
    }

    /// 可以安全用作目录名的公司标识
    pub fn file_stem(&self) -> String {
        let label: String = self
            .company_label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{:03}_{}", self.index, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_sanitizes_label() {
        let job = JobTarget::new(7, "https://x", "ACME Corp/EU");
        assert_eq!(job.file_stem(), "007_ACME_Corp_EU");
    }
}

use crate::error::{Result, SyncError};
use crate::project::finder::ProjectFiles;
use crate::project::properties;
use std::fs;

/// 프로젝트가 사용하는 빌드 도구 버전 조회
pub trait VersionResolver: Send + Sync {
    fn resolve(&self) -> Result<String>;
}

/// wrapper 프로퍼티 파일에서 버전을 읽는 resolver
///
/// 프로젝트 안에 wrapper 파일이 정확히 하나 있어야 합니다.
/// 0개 또는 2개 이상이면 추측하지 않고 에러를 반환합니다.
pub struct WrapperVersionResolver {
    files: ProjectFiles,
    wrapper_file: String,
    version_key: String,
}

impl WrapperVersionResolver {
    pub fn new(files: ProjectFiles, wrapper_file: &str, version_key: &str) -> Self {
        Self {
            files,
            wrapper_file: wrapper_file.to_string(),
            version_key: version_key.to_string(),
        }
    }
}

impl VersionResolver for WrapperVersionResolver {
    fn resolve(&self) -> Result<String> {
        let wrappers = self.files.find_by_name(&self.wrapper_file);
        if wrappers.len() != 1 {
            return Err(SyncError::WrapperNotFound {
                name: self.wrapper_file.clone(),
                found: wrappers.len(),
            });
        }

        let content = fs::read_to_string(&wrappers[0])?;
        let props = properties::parse(&content);

        props
            .get(&self.version_key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SyncError::MissingVersion {
                key: self.version_key.clone(),
            })
    }
}

/// 이미 알고 있는 버전을 그대로 반환
pub struct FixedVersion(pub String);

impl VersionResolver for FixedVersion {
    fn resolve(&self) -> Result<String> {
        if self.0.trim().is_empty() {
            return Err(SyncError::ConfigError("Empty version".to_string()));
        }
        Ok(self.0.clone())
    }
}

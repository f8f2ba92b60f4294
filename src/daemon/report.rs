use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// `GetDependencies` 응답의 페이로드
///
/// 서버가 정의하는 스키마이므로 알려진 필드 외의 값은 `extra`에 그대로 보존합니다.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DependencyReport {
    pub projects: Vec<ProjectDependencies>,
}

/// 프로젝트 하나의 의존성 목록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDependencies {
    pub name: String,
    #[serde(default)]
    pub dependencies: Vec<DependencyDescriptor>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 해석된 의존성 하나
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyDescriptor {
    /// 좌표 (예: `com.beust:jcommander:1.48`)
    pub id: String,
    #[serde(default)]
    pub scope: String,
    /// 로컬 저장소 안의 jar 경로
    #[serde(default)]
    pub path: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProjectDependencies {
    pub fn new(name: &str, dependencies: Vec<DependencyDescriptor>) -> Self {
        Self {
            name: name.to_string(),
            dependencies,
            extra: Map::new(),
        }
    }
}

impl DependencyDescriptor {
    pub fn new(id: &str, scope: &str, path: &str) -> Self {
        Self {
            id: id.to_string(),
            scope: scope.to_string(),
            path: path.to_string(),
            extra: Map::new(),
        }
    }
}

impl DependencyReport {
    /// `data` 필드 디코딩
    ///
    /// 보통은 JSON 문자열 안에 다시 인코딩된 JSON이지만, 객체가 바로 오는 경우도 받아들입니다.
    pub fn decode(data: &Value) -> Result<Self> {
        let decoded = match data {
            Value::String(encoded) => serde_json::from_str(encoded),
            other => serde_json::from_value(other.clone()),
        };

        decoded.map_err(|e| SyncError::DecodeError {
            reason: e.to_string(),
        })
    }

    /// `data` 필드에 넣을 문자열로 인코딩
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn dependency_count(&self) -> usize {
        self.projects.iter().map(|p| p.dependencies.len()).sum()
    }
}

/// 빌드 파일 하나에 대한 조회 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildFileReport {
    pub build_file: PathBuf,
    pub report: DependencyReport,
}

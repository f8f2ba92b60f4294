use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// 프로젝트 트리에서 이름으로 파일 찾기
///
/// 숨김 디렉토리와 .gitignore 대상은 건너뜁니다 (빌드 산출물, 캐시 등).
#[derive(Debug, Clone)]
pub struct ProjectFiles {
    root: PathBuf,
    max_depth: Option<usize>,
}

impl ProjectFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_depth: None,
        }
    }

    /// 탐색 최대 깊이 제한
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 파일 이름이 정확히 일치하는 모든 파일 (경로 순 정렬)
    pub fn find_by_name(&self, name: &str) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(&self.root);
        builder.require_git(false).max_depth(self.max_depth);

        let mut found: Vec<PathBuf> = builder
            .build()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|e| e.file_name() == name)
            .map(|e| e.into_path())
            .collect();

        found.sort();
        found
    }

    /// 이름으로 찾은 파일들의 정규화된 절대 경로
    pub fn find_canonical(&self, name: &str) -> std::io::Result<Vec<PathBuf>> {
        self.find_by_name(name)
            .into_iter()
            .map(|p| p.canonicalize())
            .collect()
    }
}

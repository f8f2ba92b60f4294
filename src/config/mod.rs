use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// buildsync 사용자 설정
///
/// 설정 파일은 ~/.buildsync/config.toml에 저장됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// 빌드 도구 이름 (버전 키, 배포본 경로에 사용)
    #[serde(default = "default_tool")]
    pub tool: String,

    /// 서버 호스트
    #[serde(default = "default_host")]
    pub host: String,

    /// 서버 TCP 포트
    #[serde(default = "default_port")]
    pub port: u16,

    /// 서버 jar를 실행할 런타임
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// 버전이 적힌 wrapper 설정 파일 이름
    #[serde(default = "default_wrapper_file")]
    pub wrapper_file: String,

    /// wrapper 파일의 버전 키 (미지정시 `<tool>.version`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_key: Option<String>,

    /// 빌드 설명 파일 이름
    #[serde(default = "default_build_file")]
    pub build_file: String,

    /// 버전별 서버 배포본 디렉토리 (미지정시 ~/.<tool>/wrapper/dist)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist_dir: Option<PathBuf>,

    /// 개발용: 버전과 무관하게 고정된 서버 jar 경로
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_jar: Option<PathBuf>,

    /// 최대 연결 시도 횟수
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// 연결 재시도 간격 (ms)
    #[serde(default = "default_connect_delay_ms")]
    pub connect_delay_ms: u64,

    /// 연결 시도 1회당 제한 시간 (ms)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// 응답 라인 1개당 제한 시간 (초). 미지정시 무제한 대기
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_secs: Option<u64>,

    /// 대화 종료 후 서버 종료를 기다리는 시간 (초)
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_tool() -> String {
    "kobalt".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1234
}

fn default_runtime() -> String {
    "java".to_string()
}

fn default_wrapper_file() -> String {
    "kobalt-wrapper.properties".to_string()
}

fn default_build_file() -> String {
    "Build.kt".to_string()
}

fn default_connect_attempts() -> u32 {
    3
}

fn default_connect_delay_ms() -> u64 {
    2000
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            host: default_host(),
            port: default_port(),
            runtime: default_runtime(),
            wrapper_file: default_wrapper_file(),
            version_key: None,
            build_file: default_build_file(),
            dist_dir: None,
            server_jar: None,
            connect_attempts: default_connect_attempts(),
            connect_delay_ms: default_connect_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_secs: None,
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

/// 명령줄에서 넘어온 설정 덮어쓰기 값
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub runtime: Option<String>,
    pub server_jar: Option<PathBuf>,
    pub connect_attempts: Option<u32>,
}

impl Config {
    /// 설정 디렉토리 경로
    fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            SyncError::ConfigError("Could not find home directory".to_string())
        })?;

        Ok(home.join(".buildsync"))
    }

    /// 설정 파일 경로 가져오기
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// 설정 파일에서 로드 (없으면 기본값 사용)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// 지정한 경로에서 로드
    pub fn load_from(path: &Path) -> Result<Self> {
        // 설정 파일이 없으면 기본값 반환
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            SyncError::ConfigError(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    /// 설정을 파일에 저장
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| SyncError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(Self::config_path()?, toml_string)?;

        Ok(())
    }

    /// 설정 파일 초기화 (기본값으로)
    pub fn init() -> Result<PathBuf> {
        Self::default().save()?;
        Self::config_path()
    }

    /// 명령줄 값으로 덮어쓰기
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(runtime) = overrides.runtime {
            self.runtime = runtime;
        }
        if let Some(jar) = overrides.server_jar {
            self.server_jar = Some(jar);
        }
        if let Some(attempts) = overrides.connect_attempts {
            self.connect_attempts = attempts;
        }
    }

    /// wrapper 파일에서 찾을 버전 키
    pub fn version_key(&self) -> String {
        self.version_key
            .clone()
            .unwrap_or_else(|| format!("{}.version", self.tool))
    }

    /// 서버 배포본 디렉토리
    pub fn dist_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.dist_dir {
            return Ok(dir.clone());
        }

        let home = dirs::home_dir().ok_or_else(|| {
            SyncError::ConfigError("Could not find home directory".to_string())
        })?;

        Ok(home
            .join(format!(".{}", self.tool))
            .join("wrapper")
            .join("dist"))
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tool, "kobalt");
        assert_eq!(config.port, 1234);
        assert_eq!(config.connect_attempts, 3);
        assert_eq!(config.connect_delay(), Duration::from_secs(2));
        assert_eq!(config.version_key(), "kobalt.version");
        assert_eq!(config.read_timeout(), None);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string(&config).unwrap();

        assert!(toml_string.contains("wrapper_file"));
        assert!(toml_string.contains("kobalt-wrapper.properties"));
        assert!(!toml_string.contains("server_jar"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            tool = "acme"
            port = 4321
            connect_attempts = 5
            read_timeout_secs = 30
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.port, 4321);
        assert_eq!(config.connect_attempts, 5);
        assert_eq!(config.version_key(), "acme.version");
        assert_eq!(config.read_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.runtime, "java");
    }

    #[test]
    fn test_dist_dir_follows_tool() {
        let config = Config {
            tool: "acme".to_string(),
            ..Config::default()
        };
        let dir = config.dist_dir().unwrap();
        assert!(dir.ends_with(".acme/wrapper/dist"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "port = \"not a number\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, SyncError::ConfigError(_)));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        config.apply_overrides(Overrides {
            port: Some(9999),
            server_jar: Some(PathBuf::from("/tmp/server.jar")),
            ..Overrides::default()
        });

        assert_eq!(config.port, 9999);
        assert_eq!(config.server_jar, Some(PathBuf::from("/tmp/server.jar")));
        assert_eq!(config.host, "localhost");
    }
}

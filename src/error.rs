use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Expected to find exactly one {name}, found {found}")]
    WrapperNotFound { name: String, found: usize },

    #[error("No '{key}' entry found in the wrapper properties")]
    MissingVersion { key: String },

    #[error("Server artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("Failed to launch server: {0}")]
    LaunchError(String),

    #[error("Couldn't connect to server at {addr} after {attempts} attempt(s)")]
    ConnectFailed { addr: String, attempts: u32 },

    #[error("Failed to connect to server at {addr}: {source}")]
    ConnectError {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Protocol error: {reason} (line: {line:?})")]
    ProtocolError { reason: String, line: String },

    #[error("Connection closed by server before the conversation ended")]
    ConnectionClosed,

    #[error("Timed out after {0:?} waiting for the server")]
    Timeout(Duration),

    #[error("Failed to decode dependency report: {reason}")]
    DecodeError { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// 에러 분류 (세션 경계에서 호출자에게 돌려주는 타입화된 결과)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Launch,
    Connect,
    Protocol,
    Decode,
    Io,
}

impl ErrorKind {
    /// CLI 프로세스 종료 코드
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorKind::Configuration => 2,
            ErrorKind::Launch => 3,
            ErrorKind::Connect => 4,
            ErrorKind::Protocol => 5,
            ErrorKind::Decode => 6,
            ErrorKind::Io => 1,
        }
    }
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::ConfigError(_)
            | SyncError::WrapperNotFound { .. }
            | SyncError::MissingVersion { .. } => ErrorKind::Configuration,
            SyncError::ArtifactNotFound(_) | SyncError::LaunchError(_) => ErrorKind::Launch,
            SyncError::ConnectFailed { .. } | SyncError::ConnectError { .. } => ErrorKind::Connect,
            SyncError::ProtocolError { .. }
            | SyncError::ConnectionClosed
            | SyncError::Timeout(_)
            | SyncError::JsonError(_) => ErrorKind::Protocol,
            SyncError::DecodeError { .. } => ErrorKind::Decode,
            SyncError::IoError(_) => ErrorKind::Io,
        }
    }

    /// 원본 라인을 포함한 프로토콜 에러 생성
    pub fn protocol(reason: impl Into<String>, line: &str) -> Self {
        SyncError::ProtocolError {
            reason: reason.into(),
            line: line.trim_end().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

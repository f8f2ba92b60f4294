//! buildsync: 장기 실행 빌드 서버에서 프로젝트 의존성을 가져오는 클라이언트

pub mod cli;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod error;
pub mod project;
pub mod ui;

pub use config::Config;
pub use error::{ErrorKind, Result, SyncError};

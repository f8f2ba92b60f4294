use crate::config::Overrides;
use crate::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "buildsync")]
#[command(version)]
#[command(about = "Fetch project dependencies from a long-running build server", long_about = None)]
pub struct Cli {
    /// 프로젝트 루트 디렉토리 (기본: 현재 디렉토리)
    #[arg(long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// 서버 포트
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// 서버 호스트
    #[arg(long)]
    pub host: Option<String>,

    /// 서버 jar를 실행할 런타임 (예: java)
    #[arg(long)]
    pub runtime: Option<String>,

    /// 버전별 배포본 대신 사용할 서버 jar (개발용)
    #[arg(long, value_name = "PATH")]
    pub jar: Option<PathBuf>,

    /// 최대 연결 시도 횟수
    #[arg(long)]
    pub attempts: Option<u32>,

    /// 서버를 띄우지 않고 이미 실행 중인 서버에 연결
    #[arg(long)]
    pub no_launch: bool,

    /// 조회한 의존성을 JSON 파일로 저장
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// 디버그 모드
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// 기본 설정 파일 생성 (~/.buildsync/config.toml)
    #[arg(long)]
    pub init_config: bool,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            runtime: self.runtime.clone(),
            server_jar: self.jar.clone(),
            connect_attempts: self.attempts,
        }
    }

    /// 프로젝트 디렉토리의 절대 경로
    pub fn project_dir(&self) -> Result<PathBuf> {
        let dir = match &self.project {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        Ok(dir.canonicalize()?)
    }
}

use crate::error::{Result, SyncError};
use std::ffi::OsString;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// 버전 → 서버 jar 경로
pub trait ArtifactResolver: Send + Sync {
    /// 파일이 없으면 `ArtifactNotFound`
    fn resolve(&self, version: &str) -> Result<PathBuf>;
}

/// 버전별 배포본 캐시
///
/// `<dist_dir>/<version>/<tool>/wrapper/<tool>-<version>.jar`
#[derive(Debug, Clone)]
pub struct DistributionCache {
    dist_dir: PathBuf,
    tool: String,
}

impl DistributionCache {
    pub fn new(dist_dir: impl Into<PathBuf>, tool: &str) -> Self {
        Self {
            dist_dir: dist_dir.into(),
            tool: tool.to_string(),
        }
    }

    pub fn artifact_path(&self, version: &str) -> PathBuf {
        self.dist_dir
            .join(version)
            .join(&self.tool)
            .join("wrapper")
            .join(format!("{}-{}.jar", self.tool, version))
    }
}

impl ArtifactResolver for DistributionCache {
    fn resolve(&self, version: &str) -> Result<PathBuf> {
        existing(self.artifact_path(version))
    }
}

/// 버전과 무관한 고정 경로 (로컬에서 빌드한 서버를 띄울 때)
#[derive(Debug, Clone)]
pub struct FixedArtifact(pub PathBuf);

impl ArtifactResolver for FixedArtifact {
    fn resolve(&self, _version: &str) -> Result<PathBuf> {
        existing(self.0.clone())
    }
}

fn existing(path: PathBuf) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(SyncError::ArtifactNotFound(path))
    }
}

/// 서버 프로세스 종료 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    /// 시그널로 종료된 경우 `None`
    pub code: Option<i32>,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// 실행할 명령 (스폰 전에 확인 가능)
///
/// 인자는 경로 바이트를 그대로 넘기도록 `OsString`으로 보관합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: String,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
}

impl LaunchPlan {
    /// 로그용 명령줄 (UTF-8이 아닌 부분은 대체 문자로 표시)
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|arg| arg.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

/// 실행 중인 서버 프로세스
///
/// 표준 입출력은 부모 프로세스의 것을 그대로 씁니다.
/// 핸들이 drop 되면 프로세스도 종료됩니다.
pub struct ServerProcess {
    child: Child,
    exit: Option<ExitStatus>,
}

impl ServerProcess {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// 종료될 때까지 대기
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.exit {
            return Ok(status);
        }

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| SyncError::LaunchError(format!("Failed to wait for server: {}", e)))?;

        let status = ExitStatus::from(status);
        self.exit = Some(status);
        Ok(status)
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit
    }

    /// 강제 종료 후 회수까지 대기 (이미 끝났으면 기존 상태)
    pub async fn kill(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.exit {
            return Ok(status);
        }

        self.child
            .kill()
            .await
            .map_err(|e| SyncError::LaunchError(format!("Failed to stop server: {}", e)))?;

        self.wait().await
    }
}

/// 빌드 서버 실행기
pub struct ServerLauncher {
    runtime: String,
    resolver: Box<dyn ArtifactResolver>,
}

impl ServerLauncher {
    pub fn new(runtime: &str, resolver: impl ArtifactResolver + 'static) -> Self {
        Self {
            runtime: runtime.to_string(),
            resolver: Box::new(resolver),
        }
    }

    /// `<runtime> -jar <artifact> --server --port <port>`
    pub fn plan(&self, port: u16, version: &str, working_dir: &Path) -> Result<LaunchPlan> {
        let artifact = self.resolver.resolve(version)?;
        let artifact = artifact.canonicalize().unwrap_or(artifact);

        Ok(LaunchPlan {
            program: self.runtime.clone(),
            args: vec![
                OsString::from("-jar"),
                artifact.into_os_string(),
                OsString::from("--server"),
                OsString::from("--port"),
                OsString::from(port.to_string()),
            ],
            working_dir: working_dir.to_path_buf(),
        })
    }

    /// 서버 프로세스 시작 (종료를 기다리지 않음)
    pub fn spawn(&self, port: u16, version: &str, working_dir: &Path) -> Result<ServerProcess> {
        let plan = self.plan(port, version, working_dir)?;
        info!("Launching {}", plan.command_line());

        let child = plan.command().spawn().map_err(|e| {
            SyncError::LaunchError(format!("Failed to start '{}': {}", plan.program, e))
        })?;

        Ok(ServerProcess { child, exit: None })
    }

    /// 서버를 시작하고 종료될 때까지 대기
    ///
    /// 0이 아닌 종료 코드도 에러가 아니라 `ExitStatus`로 돌려줍니다.
    pub async fn launch(&self, port: u16, version: &str, working_dir: &Path) -> Result<ExitStatus> {
        self.launch_until(port, version, working_dir, std::future::pending())
            .await
    }

    /// `launch`와 같지만 `stop`이 끝나면 서버를 종료시키고 회수한 뒤 반환
    pub async fn launch_until(
        &self,
        port: u16,
        version: &str,
        working_dir: &Path,
        stop: impl Future<Output = ()>,
    ) -> Result<ExitStatus> {
        let mut process = self.spawn(port, version, working_dir)?;

        let exited = tokio::select! {
            status = process.wait() => Some(status),
            _ = stop => None,
        };

        let status = match exited {
            Some(status) => status?,
            None => {
                let status = process.kill().await?;
                info!(%status, "Server stopped");
                return Ok(status);
            }
        };

        if status.success() {
            info!("Server exiting");
        } else {
            warn!(%status, "Server exiting with error");
        }

        Ok(status)
    }
}

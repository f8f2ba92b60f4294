use crate::config::Config;
use crate::daemon::client::ProtocolClient;
use crate::daemon::connector::{Connector, Dialer, RetryPolicy, Sleeper, TcpDialer, TokioSleeper};
use crate::daemon::launcher::{DistributionCache, ExitStatus, FixedArtifact, ServerLauncher};
use crate::daemon::report::BuildFileReport;
use crate::error::{ErrorKind, Result, SyncError};
use crate::project::{ProjectFiles, VersionResolver, WrapperVersionResolver};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// 실행 1회분의 세션 정보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub port: u16,
    pub version: String,
    pub working_dir: PathBuf,
}

/// 서버 프로세스가 어떻게 끝났는지
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerOutcome {
    /// 이미 실행 중인 서버를 사용함
    NotLaunched,
    Exited(ExitStatus),
    /// 유예 시간 안에 끝나지 않아 종료시킴
    Abandoned,
    /// 대화는 성공했지만 실행기는 실패함 (다른 서버가 이미 포트를 쓰는 경우 등)
    Failed(String),
}

/// 세션 결과
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub session: Session,
    pub reports: Vec<BuildFileReport>,
    pub server: ServerOutcome,
}

/// 실행기 태스크와 종료 신호
struct ServerTask {
    handle: JoinHandle<Result<ExitStatus>>,
    stop: oneshot::Sender<()>,
}

impl ServerTask {
    fn spawn(launcher: ServerLauncher, session: Session) -> Self {
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            launcher
                .launch_until(session.port, &session.version, &session.working_dir, async {
                    let _ = stopped.await;
                })
                .await
        });

        Self { handle, stop }
    }
}

/// 버전 조회 → 서버 실행 + 클라이언트 대화 → 정리
///
/// 서버 실행과 대화는 서로 기다리지 않는 두 개의 동시 작업입니다.
/// 서버가 준비됐는지는 연결 성공으로만 판단하며, 그 경쟁은 connector의 재시도가 흡수합니다.
pub struct SessionOrchestrator<D, S = TokioSleeper> {
    version_resolver: Box<dyn VersionResolver>,
    files: ProjectFiles,
    build_file: String,
    launcher: Option<ServerLauncher>,
    client: ProtocolClient<D, S>,
    port: u16,
    shutdown_grace: Duration,
}

impl SessionOrchestrator<TcpDialer, TokioSleeper> {
    /// 설정으로부터 구성
    ///
    /// `launch`가 false면 이미 떠 있는 서버에 연결만 합니다.
    pub fn from_config(config: &Config, project_dir: &Path, launch: bool) -> Result<Self> {
        let files = ProjectFiles::new(project_dir);
        let resolver =
            WrapperVersionResolver::new(files.clone(), &config.wrapper_file, &config.version_key());

        let dialer =
            TcpDialer::new(&config.host, config.port).with_timeout(config.connect_timeout());
        let policy = RetryPolicy::new(config.connect_attempts, config.connect_delay());
        let client =
            ProtocolClient::new(Connector::new(dialer, policy)).with_read_timeout(config.read_timeout());

        let mut orchestrator = Self::new(resolver, files, &config.build_file, client, config.port)
            .with_shutdown_grace(config.shutdown_grace());

        if launch {
            let launcher = match &config.server_jar {
                Some(jar) => ServerLauncher::new(&config.runtime, FixedArtifact(jar.clone())),
                None => ServerLauncher::new(
                    &config.runtime,
                    DistributionCache::new(config.dist_dir()?, &config.tool),
                ),
            };
            orchestrator = orchestrator.with_launcher(launcher);
        }

        Ok(orchestrator)
    }
}

impl<D: Dialer, S: Sleeper> SessionOrchestrator<D, S> {
    pub fn new(
        version_resolver: impl VersionResolver + 'static,
        files: ProjectFiles,
        build_file: &str,
        client: ProtocolClient<D, S>,
        port: u16,
    ) -> Self {
        Self {
            version_resolver: Box::new(version_resolver),
            files,
            build_file: build_file.to_string(),
            launcher: None,
            client,
            port,
            shutdown_grace: Duration::from_secs(10),
        }
    }

    pub fn with_launcher(mut self, launcher: ServerLauncher) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// 세션 실행
    ///
    /// 버전을 찾지 못하면 소켓을 열기 전에 `Configuration` 에러로 끝납니다.
    pub async fn run(self) -> Result<SessionReport> {
        let version = self.version_resolver.resolve()?;
        info!(%version, "Resolved build tool version");

        let build_files = self.files.find_canonical(&self.build_file)?;
        if build_files.is_empty() {
            warn!("No {} found under {}", self.build_file, self.files.root().display());
        }

        let session = Session {
            port: self.port,
            version,
            working_dir: self.files.root().to_path_buf(),
        };

        // 서버는 기다리지 않고 띄워 둠
        let server_task = self
            .launcher
            .map(|launcher| ServerTask::spawn(launcher, session.clone()));

        let conversation = self.client.get_dependencies(&build_files).await;

        let server = match server_task {
            Some(task) => Self::await_server(task, self.shutdown_grace).await,
            None => Ok(ServerOutcome::NotLaunched),
        };

        match (conversation, server) {
            (Ok(reports), Ok(server)) => Ok(SessionReport {
                session,
                reports,
                server,
            }),
            (Ok(reports), Err(launch_err)) => {
                warn!("Conversation succeeded but the launcher failed: {}", launch_err);
                Ok(SessionReport {
                    session,
                    reports,
                    server: ServerOutcome::Failed(launch_err.to_string()),
                })
            }
            // 서버가 뜨지 못해서 연결이 안 된 경우 원인을 보고
            (Err(conv_err), Err(launch_err)) if conv_err.kind() == ErrorKind::Connect => {
                error!("{}", conv_err);
                Err(launch_err)
            }
            (Err(conv_err), server) => {
                if let Err(launch_err) = server {
                    error!("{}", launch_err);
                }
                Err(conv_err)
            }
        }
    }

    /// 유예 시간 안에 끝나지 않으면 서버를 종료시키고 회수될 때까지 대기
    async fn await_server(mut task: ServerTask, grace: Duration) -> Result<ServerOutcome> {
        match tokio::time::timeout(grace, &mut task.handle).await {
            Ok(joined) => Self::joined(joined).map(ServerOutcome::Exited),
            Err(_) => {
                warn!(
                    "Server still running {:?} after the conversation, stopping it",
                    grace
                );
                let _ = task.stop.send(());

                if let Err(e) = Self::joined(task.handle.await) {
                    warn!("Failed to stop server: {}", e);
                }
                Ok(ServerOutcome::Abandoned)
            }
        }
    }

    fn joined(
        joined: std::result::Result<Result<ExitStatus>, tokio::task::JoinError>,
    ) -> Result<ExitStatus> {
        joined.map_err(|e| SyncError::LaunchError(format!("Launcher task failed: {}", e)))?
    }
}

//! 서버 연결 (재시도 포함)
//!
//! 서버 프로세스와 클라이언트는 서로 기다리지 않고 동시에 시작합니다.
//! 서버가 아직 listen 하기 전이면 연결이 거부되므로, 여기의 재시도가
//! 두 작업 사이의 유일한 동기화 수단입니다.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// 연결 재시도 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// `attempt`번째 시도가 `err`로 실패했을 때 다시 시도할지 여부
    pub fn should_retry(&self, attempt: u32, err: &io::Error) -> bool {
        attempt < self.max_attempts && is_not_listening(err)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// 아직 아무도 listen 하지 않는 포트에 연결한 경우
pub fn is_not_listening(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::ConnectionRefused
}

/// 재시도 사이의 대기
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// 연결 1회 시도
#[async_trait]
pub trait Dialer: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// 로그, 에러 메시지에 쓰는 주소
    fn address(&self) -> String;

    async fn dial(&self) -> io::Result<Self::Stream>;
}

/// TCP 연결
#[derive(Debug, Clone)]
pub struct TcpDialer {
    host: String,
    port: u16,
    timeout: Option<Duration>,
}

impl TcpDialer {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout: None,
        }
    }

    /// 시도 1회당 제한 시간
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn dial(&self) -> io::Result<TcpStream> {
        let connect = TcpStream::connect((self.host.as_str(), self.port));

        let stream = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, connect).await.map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect timed out after {}ms", limit.as_millis()),
                )
            })??,
            None => connect.await?,
        };

        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// 재시도 정책에 따라 연결을 맺는 connector
pub struct Connector<D, S = TokioSleeper> {
    dialer: D,
    policy: RetryPolicy,
    sleeper: S,
}

impl<D: Dialer> Connector<D, TokioSleeper> {
    pub fn new(dialer: D, policy: RetryPolicy) -> Self {
        Self::with_sleeper(dialer, policy, TokioSleeper)
    }
}

impl<D: Dialer, S: Sleeper> Connector<D, S> {
    pub fn with_sleeper(dialer: D, policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            dialer,
            policy,
            sleeper,
        }
    }

    pub fn address(&self) -> String {
        self.dialer.address()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// 연결될 때까지 시도
    ///
    /// 연결 거부만 재시도합니다. 다른 종류의 실패는 바로 `ConnectError`,
    /// 시도를 모두 소진하면 `ConnectFailed`입니다.
    pub async fn connect(&self) -> Result<D::Stream> {
        let addr = self.dialer.address();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(%addr, attempt, "Dialing server");

            match self.dialer.dial().await {
                Ok(stream) => {
                    info!(%addr, attempt, "Connected to server");
                    return Ok(stream);
                }
                Err(e) if self.policy.should_retry(attempt, &e) => {
                    warn!(
                        %addr,
                        attempt,
                        "Server not started yet, retrying in {}ms",
                        self.policy.delay.as_millis()
                    );
                    self.sleeper.sleep(self.policy.delay).await;
                }
                Err(e) if is_not_listening(&e) => {
                    return Err(SyncError::ConnectFailed {
                        addr,
                        attempts: attempt,
                    });
                }
                Err(e) => {
                    return Err(SyncError::ConnectError { addr, source: e });
                }
            }
        }
    }
}

//! 단위 테스트용 dialer / sleeper

use crate::daemon::connector::{Dialer, Sleeper};
use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::DuplexStream;

/// 처음 `refusals`번은 연결을 거부하고 그 다음부터 성공하는 dialer
#[derive(Clone)]
pub struct FlakyDialer {
    attempts: Arc<AtomicU32>,
    refusals: u32,
    failure: Option<io::ErrorKind>,
    stream: Arc<Mutex<Option<DuplexStream>>>,
}

impl FlakyDialer {
    pub fn refusing(refusals: u32) -> Self {
        Self {
            attempts: Arc::new(AtomicU32::new(0)),
            refusals,
            failure: None,
            stream: Arc::new(Mutex::new(None)),
        }
    }

    /// 항상 `kind`로 실패
    pub fn failing(kind: io::ErrorKind) -> Self {
        Self {
            failure: Some(kind),
            ..Self::refusing(0)
        }
    }

    /// 연결 성공 시 넘겨줄 스트림 지정
    pub fn with_stream(refusals: u32, stream: DuplexStream) -> Self {
        let dialer = Self::refusing(refusals);
        *dialer.stream.lock().unwrap() = Some(stream);
        dialer
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dialer for FlakyDialer {
    type Stream = DuplexStream;

    fn address(&self) -> String {
        "localhost:1234".to_string()
    }

    async fn dial(&self) -> io::Result<DuplexStream> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(kind) = self.failure {
            return Err(io::Error::from(kind));
        }
        if attempt <= self.refusals {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        }

        let stored = self.stream.lock().unwrap().take();
        Ok(stored.unwrap_or_else(|| tokio::io::duplex(1024).0))
    }
}

/// 실제로 기다리지 않고 요청된 시간만 기록
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

/// 자기 PID를 `<dir>/server.pid`에 적고 60초 동안 살아 있는 가짜 런타임
#[cfg(unix)]
pub fn sleeping_runtime(dir: &std::path::Path) -> (std::path::PathBuf, std::path::PathBuf) {
    use std::os::unix::fs::PermissionsExt;

    let pid_file = dir.join("server.pid");
    let runtime = dir.join("sleepy-java");
    std::fs::write(
        &runtime,
        format!("#!/bin/sh\necho $$ > '{}'\nexec sleep 60\n", pid_file.display()),
    )
    .unwrap();
    std::fs::set_permissions(&runtime, std::fs::Permissions::from_mode(0o755)).unwrap();

    (runtime, pid_file)
}

/// `kill -0`으로 프로세스 존재 확인
#[cfg(unix)]
pub fn is_running(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

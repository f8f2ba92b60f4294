use crate::daemon::connector::{Connector, Dialer, Sleeper, TokioSleeper};
use crate::daemon::protocol::{Message, Response};
use crate::daemon::report::BuildFileReport;
use crate::error::{Result, SyncError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tracing::{debug, info};

/// 연결 하나의 대화 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// 다음 요청을 보낼 수 있음
    Connected,
    /// 요청을 보내고 응답 한 줄을 기다리는 중
    AwaitingResponse,
    /// `Quit`을 주고받음. 더 이상 읽거나 쓰지 않음
    Closed,
}

/// 연결 하나 위에서의 요청/응답 대화
///
/// 한 번에 요청 하나만 보내고, 요청마다 응답 한 줄을 읽습니다.
/// 연결은 이 구조체가 소유하며 `quit`으로 소비되므로 재사용되지 않습니다.
pub struct Conversation<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    state: ConversationState,
    read_timeout: Option<Duration>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Conversation<S> {
    pub fn new(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);

        Self {
            reader: BufReader::new(reader),
            writer,
            state: ConversationState::Connected,
            read_timeout: None,
        }
    }

    /// 응답 한 줄당 제한 시간
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// `GetDependencies` 요청을 보내고 응답 한 줄을 받음
    ///
    /// 서버가 `Quit`으로 응답하면 `Quit`을 돌려보내고 대화를 닫습니다.
    pub async fn get_dependencies(&mut self, build_file: &Path) -> Result<Response> {
        if self.state != ConversationState::Connected {
            return Err(SyncError::protocol(
                format!("cannot send a request while {:?}", self.state),
                "",
            ));
        }

        let request = Message::get_dependencies(build_file)?;
        self.send(&request).await?;
        self.state = ConversationState::AwaitingResponse;

        let line = self.read_line().await?;
        let response = Message::parse_response(&line)?;

        match &response {
            Response::Data(report) => {
                info!(
                    build_file = %build_file.display(),
                    project_count = report.project_count(),
                    "Read GetDependencies data"
                );
                self.state = ConversationState::Connected;
            }
            Response::Quit => {
                info!("Server asked to quit");
                self.send(&Message::quit()).await?;
                self.state = ConversationState::Closed;
            }
        }

        Ok(response)
    }

    /// 대화 종료
    ///
    /// 아직 `Quit`을 주고받지 않았으면 보내고, 쓰기 방향을 닫습니다.
    pub async fn quit(mut self) -> Result<()> {
        if self.state != ConversationState::Closed {
            self.send(&Message::quit()).await?;
            self.state = ConversationState::Closed;
        }

        if let Err(e) = self.writer.shutdown().await {
            debug!("Ignoring shutdown error: {}", e);
        }

        Ok(())
    }

    async fn send(&mut self, message: &Message) -> Result<()> {
        let line = message.to_line()?;
        debug!(line = line.trim_end(), "Sending to server");

        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// 비어 있지 않은 다음 줄
    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();

        loop {
            line.clear();

            let read = self.reader.read_line(&mut line);
            let bytes_read = match self.read_timeout {
                Some(limit) => tokio::time::timeout(limit, read)
                    .await
                    .map_err(|_| SyncError::Timeout(limit))??,
                None => read.await?,
            };

            if bytes_read == 0 {
                return Err(SyncError::ConnectionClosed);
            }

            debug!(line = line.trim_end(), "Received from server");

            if !line.trim().is_empty() {
                return Ok(line);
            }
        }
    }
}

/// 빌드 서버 클라이언트
///
/// 연결(재시도 포함) → 빌드 파일마다 요청 → `Quit` 순서로 대화 하나를 진행합니다.
pub struct ProtocolClient<D, S = TokioSleeper> {
    connector: Connector<D, S>,
    read_timeout: Option<Duration>,
}

impl<D: Dialer, S: Sleeper> ProtocolClient<D, S> {
    pub fn new(connector: Connector<D, S>) -> Self {
        Self {
            connector,
            read_timeout: None,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn address(&self) -> String {
        self.connector.address()
    }

    /// 빌드 파일들의 의존성 조회
    ///
    /// 서버가 중간에 `Quit`을 보내면 남은 파일은 보내지 않고, 그때까지의 결과를 반환합니다.
    /// 대화는 항상 `Quit` 하나로 끝납니다.
    pub async fn get_dependencies(&self, build_files: &[PathBuf]) -> Result<Vec<BuildFileReport>> {
        let stream = self.connector.connect().await?;
        let mut conversation = Conversation::new(stream).with_read_timeout(self.read_timeout);

        match Self::converse(&mut conversation, build_files).await {
            Ok(reports) => {
                conversation.quit().await?;
                Ok(reports)
            }
            Err(SyncError::ConnectionClosed) => Err(SyncError::ConnectionClosed),
            Err(e) => {
                // 실패한 대화라도 서버 쪽 세션은 정리
                if let Err(quit_err) = conversation.quit().await {
                    debug!("Best-effort quit failed: {}", quit_err);
                }
                Err(e)
            }
        }
    }

    async fn converse(
        conversation: &mut Conversation<D::Stream>,
        build_files: &[PathBuf],
    ) -> Result<Vec<BuildFileReport>> {
        let mut reports = Vec::with_capacity(build_files.len());

        for build_file in build_files {
            match conversation.get_dependencies(build_file).await? {
                Response::Data(report) => reports.push(BuildFileReport {
                    build_file: build_file.clone(),
                    report,
                }),
                Response::Quit => {
                    info!(
                        remaining = build_files.len() - reports.len() - 1,
                        "Server quit before all build files were sent"
                    );
                    break;
                }
            }
        }

        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::connector::RetryPolicy;
    use crate::daemon::report::{DependencyReport, ProjectDependencies};
    use crate::daemon::testing::{FlakyDialer, RecordingSleeper};
    use tokio::io::DuplexStream;
    use tokio::task::JoinHandle;

    fn report(names: &[&str]) -> DependencyReport {
        DependencyReport {
            projects: names
                .iter()
                .map(|name| ProjectDependencies::new(name, vec![]))
                .collect(),
        }
    }

    fn data_line(names: &[&str]) -> String {
        Message::DataResponse(report(names)).to_line().unwrap()
    }

    /// 요청마다 `replies`의 다음 줄로 응답하는 서버. 받은 메시지를 모두 돌려줌
    ///
    /// 준비된 응답이 떨어지면 연결을 닫습니다.
    fn spawn_server(stream: DuplexStream, replies: Vec<String>) -> JoinHandle<Vec<Message>> {
        tokio::spawn(async move {
            let (reader, mut writer) = tokio::io::split(stream);
            let mut lines = BufReader::new(reader).lines();
            let mut replies = replies.into_iter();
            let mut received = Vec::new();

            while let Ok(Some(line)) = lines.next_line().await {
                let message = Message::parse(&line).unwrap();
                let is_request = matches!(message, Message::Request { .. });
                received.push(message);

                if is_request {
                    match replies.next() {
                        Some(reply) => {
                            writer.write_all(reply.as_bytes()).await.unwrap();
                            writer.flush().await.unwrap();
                        }
                        None => break,
                    }
                }
            }

            received
        })
    }

    fn client(dialer: FlakyDialer) -> ProtocolClient<FlakyDialer, RecordingSleeper> {
        ProtocolClient::new(Connector::with_sleeper(
            dialer,
            RetryPolicy::default(),
            RecordingSleeper::default(),
        ))
    }

    fn quit_count(messages: &[Message]) -> usize {
        messages.iter().filter(|m| m.is_quit()).count()
    }

    #[tokio::test]
    async fn test_single_build_file() {
        let (client_end, server_end) = tokio::io::duplex(64 * 1024);
        let server = spawn_server(server_end, vec![data_line(&["core", "app"])]);

        let build_file = PathBuf::from("/work/project/kobalt/src/Build.kt");
        let reports = client(FlakyDialer::with_stream(0, client_end))
            .get_dependencies(&[build_file.clone()])
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].build_file, build_file);
        assert_eq!(reports[0].report.project_count(), 2);

        let received = server.await.unwrap();
        assert_eq!(
            received,
            vec![
                Message::Request {
                    build_file: "/work/project/kobalt/src/Build.kt".to_string()
                },
                Message::quit(),
            ]
        );
    }

    #[tokio::test]
    async fn test_multiple_build_files_end_with_one_quit() {
        let (client_end, server_end) = tokio::io::duplex(64 * 1024);
        let server = spawn_server(server_end, vec![data_line(&["a"]), data_line(&["b", "c"])]);

        let files = vec![PathBuf::from("/p/a/Build.kt"), PathBuf::from("/p/b/Build.kt")];
        let reports = client(FlakyDialer::with_stream(0, client_end))
            .get_dependencies(&files)
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].report.project_count(), 2);

        let received = server.await.unwrap();
        assert_eq!(received.len(), 3);
        assert!(received.last().unwrap().is_quit());
        assert_eq!(quit_count(&received), 1);
    }

    #[tokio::test]
    async fn test_no_build_files_still_quits() {
        let (client_end, server_end) = tokio::io::duplex(1024);
        let server = spawn_server(server_end, vec![]);

        let reports = client(FlakyDialer::with_stream(0, client_end))
            .get_dependencies(&[])
            .await
            .unwrap();

        assert!(reports.is_empty());
        assert_eq!(server.await.unwrap(), vec![Message::quit()]);
    }

    #[tokio::test]
    async fn test_server_quit_is_echoed_once() {
        let (client_end, server_end) = tokio::io::duplex(64 * 1024);
        // Quit 뒤에 오는 줄은 읽지 않아야 함
        let reply = format!("{}{}", Message::quit().to_line().unwrap(), data_line(&["late"]));
        let server = spawn_server(server_end, vec![reply]);

        let files = vec![PathBuf::from("/p/a/Build.kt"), PathBuf::from("/p/b/Build.kt")];
        let reports = client(FlakyDialer::with_stream(0, client_end))
            .get_dependencies(&files)
            .await
            .unwrap();

        assert!(reports.is_empty());

        // 두 번째 요청은 보내지 않고, Quit은 한 번만
        let received = server.await.unwrap();
        assert_eq!(received.len(), 2);
        assert!(matches!(received[0], Message::Request { .. }));
        assert_eq!(quit_count(&received), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_build_file_is_never_sent() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (client_end, server_end) = tokio::io::duplex(1024);
        let server = spawn_server(server_end, vec![data_line(&["core"])]);

        let file = PathBuf::from(OsStr::from_bytes(b"/p/caf\xe9/Build.kt"));
        let err = client(FlakyDialer::with_stream(0, client_end))
            .get_dependencies(&[file])
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::ProtocolError { .. }));
        assert_eq!(server.await.unwrap(), vec![Message::quit()]);
    }

    #[tokio::test]
    async fn test_connects_after_refusals() {
        let (client_end, server_end) = tokio::io::duplex(64 * 1024);
        let server = spawn_server(server_end, vec![data_line(&["core"])]);

        let dialer = FlakyDialer::with_stream(2, client_end);
        let reports = client(dialer.clone())
            .get_dependencies(&[PathBuf::from("/p/Build.kt")])
            .await
            .unwrap();

        assert_eq!(dialer.attempts(), 3);
        assert_eq!(reports.len(), 1);
        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_connect_failure_performs_no_io() {
        let (client_end, _server_end) = tokio::io::duplex(1024);
        let dialer = FlakyDialer::with_stream(3, client_end);

        let err = client(dialer.clone())
            .get_dependencies(&[PathBuf::from("/p/Build.kt")])
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::ConnectFailed { attempts: 3, .. }));
        assert_eq!(dialer.attempts(), 3);
    }

    #[tokio::test]
    async fn test_stream_closed_before_response() {
        let (client_end, server_end) = tokio::io::duplex(1024);
        let server = spawn_server(server_end, vec![]);

        let err = client(FlakyDialer::with_stream(0, client_end))
            .get_dependencies(&[PathBuf::from("/p/Build.kt")])
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::ConnectionClosed));
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_response_aborts_with_quit() {
        let (client_end, server_end) = tokio::io::duplex(1024);
        let server = spawn_server(server_end, vec!["this is not json\n".to_string()]);

        let err = client(FlakyDialer::with_stream(0, client_end))
            .get_dependencies(&[PathBuf::from("/p/a/Build.kt"), PathBuf::from("/p/b/Build.kt")])
            .await
            .unwrap_err();

        match err {
            SyncError::ProtocolError { line, .. } => assert_eq!(line, "this is not json"),
            other => panic!("Wrong error type: {:?}", other),
        }

        let received = server.await.unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(quit_count(&received), 1);
    }

    #[tokio::test]
    async fn test_bad_payload_is_decode_error() {
        let (client_end, server_end) = tokio::io::duplex(1024);
        let bad = format!("{}\n", serde_json::json!({ "data": "{\"projects\":{}}" }));
        let _server = spawn_server(server_end, vec![bad]);

        let err = client(FlakyDialer::with_stream(0, client_end))
            .get_dependencies(&[PathBuf::from("/p/Build.kt")])
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::DecodeError { .. }));
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let (client_end, server_end) = tokio::io::duplex(64 * 1024);
        let server = spawn_server(server_end, vec![format!("\n  \n{}", data_line(&["core"]))]);

        let reports = client(FlakyDialer::with_stream(0, client_end))
            .get_dependencies(&[PathBuf::from("/p/Build.kt")])
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let (client_end, _server_end) = tokio::io::duplex(1024);

        let mut conversation =
            Conversation::new(client_end).with_read_timeout(Some(Duration::from_millis(50)));

        let err = conversation
            .get_dependencies(Path::new("/p/Build.kt"))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Timeout(_)));
        assert_eq!(conversation.state(), ConversationState::AwaitingResponse);
    }

    #[tokio::test]
    async fn test_closed_conversation_rejects_requests() {
        let (client_end, server_end) = tokio::io::duplex(1024);
        let _server = spawn_server(server_end, vec![Message::quit().to_line().unwrap()]);

        let mut conversation = Conversation::new(client_end);
        let response = conversation
            .get_dependencies(Path::new("/p/Build.kt"))
            .await
            .unwrap();

        assert_eq!(response, Response::Quit);
        assert_eq!(conversation.state(), ConversationState::Closed);
        assert!(conversation
            .get_dependencies(Path::new("/p/Build.kt"))
            .await
            .is_err());
    }
}

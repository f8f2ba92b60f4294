use crate::daemon::report::DependencyReport;
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

pub const GET_DEPENDENCIES: &str = "GetDependencies";
pub const QUIT: &str = "Quit";

/// 빌드 서버와 주고받는 메시지 (줄 단위 JSON)
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// 빌드 파일의 의존성 요청 (클라이언트 → 서버)
    Request { build_file: String },
    /// `data` 필드를 가진 응답 (서버 → 클라이언트)
    DataResponse(DependencyReport),
    /// 세션 종료 신호 (양방향)
    Control(Control),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Quit,
}

/// 요청 하나에 대해 서버가 돌려줄 수 있는 응답
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Data(DependencyReport),
    Quit,
}

/// 실제 전송 형태
#[derive(Debug, Default, Serialize, Deserialize)]
struct WireMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "buildFile", default, skip_serializing_if = "Option::is_none")]
    build_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl Message {
    /// 경로가 UTF-8이 아니면 JSON으로 그대로 보낼 수 없으므로 에러
    pub fn get_dependencies(build_file: &Path) -> Result<Self> {
        let build_file = build_file.to_str().ok_or_else(|| {
            SyncError::protocol(
                format!("build file path is not valid UTF-8: {}", build_file.display()),
                "",
            )
        })?;

        Ok(Message::Request {
            build_file: build_file.to_string(),
        })
    }

    pub fn quit() -> Self {
        Message::Control(Control::Quit)
    }

    pub fn is_quit(&self) -> bool {
        matches!(self, Message::Control(Control::Quit))
    }

    /// JSON으로 직렬화 (한 줄, 개행 없음)
    pub fn to_json(&self) -> Result<String> {
        let wire = match self {
            Message::Request { build_file } => WireMessage {
                name: Some(GET_DEPENDENCIES.to_string()),
                build_file: Some(build_file.clone()),
                data: None,
            },
            Message::DataResponse(report) => WireMessage {
                name: Some(GET_DEPENDENCIES.to_string()),
                build_file: None,
                data: Some(Value::String(report.encode()?)),
            },
            Message::Control(Control::Quit) => WireMessage {
                name: Some(QUIT.to_string()),
                ..WireMessage::default()
            },
        };

        Ok(serde_json::to_string(&wire)?)
    }

    /// 전송할 한 줄 (끝에 개행 하나)
    pub fn to_line(&self) -> Result<String> {
        let mut line = self.to_json()?;
        line.push('\n');
        Ok(line)
    }

    /// 한 줄을 메시지로 파싱
    ///
    /// `name`이 `Quit`이면 제어 메시지, `data`가 있으면 데이터 응답입니다.
    /// `data`가 있으면 `name`은 보지 않습니다.
    pub fn parse(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line.trim())
            .map_err(|e| SyncError::protocol(format!("malformed JSON: {}", e), line))?;

        if !value.is_object() {
            return Err(SyncError::protocol("expected a JSON object", line));
        }

        let wire: WireMessage = serde_json::from_value(value)
            .map_err(|e| SyncError::protocol(format!("unexpected message shape: {}", e), line))?;

        if wire.name.as_deref() == Some(QUIT) {
            return Ok(Message::quit());
        }

        match (wire.data, wire.name.as_deref(), wire.build_file) {
            (Some(data), _, _) => Ok(Message::DataResponse(DependencyReport::decode(&data)?)),
            (_, Some(GET_DEPENDENCIES), Some(build_file)) => Ok(Message::Request { build_file }),
            _ => Err(SyncError::protocol("missing 'data' field", line)),
        }
    }

    /// 서버가 보낸 줄 파싱 (요청 메시지는 프로토콜 에러)
    pub fn parse_response(line: &str) -> Result<Response> {
        match Self::parse(line)? {
            Message::DataResponse(report) => Ok(Response::Data(report)),
            Message::Control(Control::Quit) => Ok(Response::Quit),
            Message::Request { .. } => {
                Err(SyncError::protocol("unexpected request from server", line))
            }
        }
    }
}

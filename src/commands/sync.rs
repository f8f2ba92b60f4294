use crate::cli::Cli;
use crate::config::Config;
use crate::daemon::report::BuildFileReport;
use crate::daemon::session::{SessionOrchestrator, SessionReport};
use crate::error::Result;
use crate::ui;
use chrono::{DateTime, Utc};
use colored::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// `--output`으로 저장하는 파일 형식
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyExport {
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub project_root: PathBuf,
    pub build_files: Vec<BuildFileReport>,
}

impl DependencyExport {
    pub fn from_session(report: &SessionReport) -> Self {
        Self {
            generated_at: Utc::now(),
            version: report.session.version.clone(),
            project_root: report.session.working_dir.clone(),
            build_files: report.reports.clone(),
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// 의존성 동기화 1회 실행
pub async fn run_sync(cli: &Cli) -> Result<()> {
    let mut config = Config::load()?;
    config.apply_overrides(cli.overrides());

    let project_dir = cli.project_dir()?;
    eprintln!(
        "{} Syncing {} ({}:{})",
        "[>>]".cyan().bold(),
        project_dir.display(),
        config.host,
        config.port
    );

    let orchestrator = SessionOrchestrator::from_config(&config, &project_dir, !cli.no_launch)?;
    let report = orchestrator.run().await?;

    ui::report::print_session(&report, cli.debug);

    if let Some(path) = &cli.output {
        DependencyExport::from_session(&report).write_to(path)?;
        eprintln!("{} Saved dependencies to {}", "[OK]".green(), path.display());
    }

    Ok(())
}

/// 기본 설정 파일 생성
pub fn init_config() -> Result<()> {
    let path = Config::init()?;
    eprintln!("{} Wrote default config to {}", "[OK]".green(), path.display());
    Ok(())
}

use crate::daemon::session::{ServerOutcome, SessionReport};
use colored::*;

/// 세션 결과 요약 (한 줄씩)
pub fn summary_lines(report: &SessionReport, verbose: bool) -> Vec<String> {
    let mut lines = Vec::new();

    for file in &report.reports {
        lines.push(format!(
            "{} {}: project count: {}",
            "[OK]".green().bold(),
            file.build_file.display(),
            file.report.project_count()
        ));

        for project in &file.report.projects {
            lines.push(format!(
                "  {} {} ({} dependencies)",
                "[PKG]".cyan(),
                project.name,
                project.dependencies.len()
            ));

            if verbose {
                for dep in &project.dependencies {
                    lines.push(format!("      {} {}", dep.scope.dimmed(), dep.id));
                }
            }
        }
    }

    if report.reports.is_empty() {
        lines.push(format!("{} No dependencies received.", "[!]".yellow()));
    }

    lines
}

/// 서버 종료 상태 한 줄
pub fn server_line(outcome: &ServerOutcome) -> Option<String> {
    match outcome {
        ServerOutcome::NotLaunched => None,
        ServerOutcome::Exited(status) if status.success() => {
            Some(format!("{} Server exiting", "[v]".green()))
        }
        ServerOutcome::Exited(status) => Some(format!(
            "{} Server exiting with error ({})",
            "[!]".yellow(),
            status
        )),
        ServerOutcome::Abandoned => Some(format!(
            "{} Server did not exit after the conversation and was stopped",
            "[!]".yellow()
        )),
        ServerOutcome::Failed(reason) => {
            Some(format!("{} Server launch failed: {}", "[X]".red(), reason))
        }
    }
}

pub fn print_session(report: &SessionReport, verbose: bool) {
    for line in summary_lines(report, verbose) {
        println!("{}", line);
    }

    if let Some(line) = server_line(&report.server) {
        eprintln!("{}", line);
    }
}

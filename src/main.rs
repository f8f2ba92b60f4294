use buildsync::cli::Cli;
use buildsync::commands;
use buildsync::error::Result;
use clap::Parser;
use colored::*;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// RUST_LOG가 있으면 그대로, 없으면 --debug 여부로 결정
fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("buildsync={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run(cli: &Cli) -> Result<()> {
    if cli.init_config {
        return commands::init_config();
    }

    commands::run_sync(cli).await
}

// 서버 실행과 클라이언트 대화가 동시에 진행되므로 워커 2개
// 종료 코드를 반환값으로 넘겨 런타임이 정상적으로 내려가게 함
#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if cli.debug {
        eprintln!("{} {:?}", "DEBUG:".yellow(), cli);
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "[X]".red().bold(), err);
            ExitCode::from(err.kind().exit_code())
        }
    }
}

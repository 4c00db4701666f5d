//! # Outreach-Oxide 命令行入口
//!
//! 执行一次完整的外联运行：认证、搜索、发送连接请求、向已接受的连接发送后续消息。
//!
//! ## 主要功能
//! - 加载并校验配置（TOML 文件 + `OUTREACH__` 前缀的环境变量覆盖）
//! - 初始化日志（文本或 JSON，`RUST_LOG` 优先于配置）
//! - 连接已运行浏览器的 DevTools 端点，打开 SQLite 状态库
//! - 收到 SIGINT/SIGTERM 时在下一个检查点协作式停止
//! - 打印运行报告并以退出码表示结果
//!
//! ## 退出码
//! - `0`: 运行完成、不在活动窗口内或被停止
//! - `1`: 运行失败
//! - `2`: 配置或启动失败
//! - `3`: 遇到安全验证，需要人工处理
//!
//! ## 环境变量
//! - `RUST_LOG`: 日志过滤器（覆盖 `logging.level`）
//! - `OUTREACH__CREDENTIALS__USERNAME` / `OUTREACH__CREDENTIALS__PASSWORD`: 登录凭据
//! - `OUTREACH__DRIVER__CDP_ENDPOINT`: DevTools 端点（默认: http://localhost:9222）

use anyhow::Context;
use clap::Parser;
use outreach_oxide::config::Config;
use outreach_oxide::driver::CdpPageDriver;
use outreach_oxide::policy::SystemClock;
use outreach_oxide::store::SqliteStore;
use outreach_oxide::workflow::template::validate_template;
use outreach_oxide::workflow::{stop_channel, PhaseOrchestrator, RunOutcome, StopHandle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "outreach-oxide", version, about)]
struct Cli {
    /// Configuration file (TOML); environment variables alone when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Validate configuration and templates, print the effective settings, and exit
    #[arg(long)]
    dry_run: bool,

    /// Seed for every behavioral model; replays a run exactly
    #[arg(long)]
    seed: Option<u64>,

    /// DevTools endpoint, overriding the configuration
    #[arg(long, value_name = "URL")]
    cdp_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("outreach-oxide: {:#}", e);
            return ExitCode::from(2);
        }
    };

    init_tracing(&config);
    info!("Outreach-Oxide v{}", outreach_oxide::VERSION);

    if cli.dry_run {
        return dry_run(&config);
    }
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return ExitCode::from(2);
    }

    let store = match SqliteStore::open(&config.store.path)
        .with_context(|| format!("opening state store {}", config.store.path))
    {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(2);
        }
    };

    let driver = match CdpPageDriver::connect(&config.driver)
        .await
        .with_context(|| format!("attaching to browser at {}", config.driver.cdp_endpoint))
    {
        Ok(driver) => Arc::new(driver),
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(2);
        }
    };

    let (stop, signal) = stop_channel();
    spawn_signal_handler(stop);

    let mut orchestrator = match PhaseOrchestrator::new(
        config,
        driver.clone(),
        store,
        Arc::new(SystemClock),
        signal,
    ) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!(error = %e, "Failed to prepare run");
            return ExitCode::from(2);
        }
    };

    let report = orchestrator.run().await;

    if let Err(e) = driver.close().await {
        warn!(error = %e, "Failed to close browser connection");
    }

    println!("{}", report);
    match report.outcome {
        RunOutcome::Completed | RunOutcome::OutsideWindow | RunOutcome::Stopped => ExitCode::SUCCESS,
        RunOutcome::Challenge(kind) => {
            eprintln!("{}", kind.instructions());
            ExitCode::from(3)
        }
        RunOutcome::Failed(_) => ExitCode::from(1),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::from_env().context("loading configuration from environment")?,
    };
    if let Some(seed) = cli.seed {
        config.stealth.seed = Some(seed);
    }
    if let Some(endpoint) = &cli.cdp_endpoint {
        config.driver.cdp_endpoint = endpoint.clone();
    }
    Ok(config)
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if config.logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Print what a run would use, with secrets masked
fn dry_run(config: &Config) -> ExitCode {
    let mut shown = config.clone();
    shown.credentials.username = mask(&shown.credentials.username);
    shown.credentials.password = if shown.credentials.password.is_empty() {
        String::new()
    } else {
        "********".to_string()
    };

    match serde_json::to_string_pretty(&shown) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!(error = %e, "Failed to render configuration");
            return ExitCode::from(2);
        }
    }

    for line in template_report(config) {
        println!("{}", line);
    }
    if let Err(e) = config.validate() {
        println!("configuration error: {}", e);
        return ExitCode::from(2);
    }
    info!("Dry run complete, nothing was sent");
    ExitCode::SUCCESS
}

/// One line per note and message template
fn template_report(config: &Config) -> Vec<String> {
    config
        .connection
        .note_templates
        .iter()
        .chain(config.messaging.templates.iter())
        .map(|template| match validate_template(template) {
            Ok(()) => format!("template ok: {}", template),
            Err(e) => format!("template error: {}: {}", template, e),
        })
        .collect()
}

/// Keep the first character and the domain of an address
fn mask(username: &str) -> String {
    let mut chars = username.chars();
    match (chars.next(), username.find('@')) {
        (Some(first), Some(at)) => format!("{}***{}", first, &username[at..]),
        (Some(first), None) => format!("{}***", first),
        (None, _) => String::new(),
    }
}

fn spawn_signal_handler(stop: StopHandle) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    _ => {
                        warn!("Signal handlers unavailable, stop requests will be ignored");
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT signal");
                }
            }
        }

        #[cfg(windows)]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C signal");
        }

        info!("Stopping at the next checkpoint...");
        stop.stop();
    });
}

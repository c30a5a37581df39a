//! # Motor CLI
//!
//! 步进电机串口控制器的命令行控制面板。
//!
//! ## 双模式架构
//!
//! ### One-shot 模式（适合脚本）
//!
//! ```bash
//! # 配置默认串口
//! motor-cli config set --port /dev/ttyUSB0
//!
//! # 执行操作（内部：连接 -> 使能 -> 移动 -> 断开）
//! motor-cli move --angle 90 --frequency 50
//! ```
//!
//! ### REPL 模式（交互式控制面板）
//!
//! ```bash
//! $ motor-cli shell
//! motor> connect /dev/ttyUSB0
//! motor> power
//! motor> move 90
//! motor> cal start
//! motor> exit
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod modes;
mod utils;

use commands::config::{CliConfig, resolve_config_path};
use commands::{ConfigCommand, HomeCommand, MoveCommand, PortsCommand, StopCommand};
use modes::oneshot::OneShotMode;
use modes::repl::run_repl;

/// Motor CLI - 步进电机控制面板
#[derive(Parser, Debug)]
#[command(name = "motor-cli")]
#[command(about = "Command-line control panel for a serial stepper motor controller", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/motor-cli/config.toml）
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 列出可用串口
    Ports {
        #[command(flatten)]
        args: PortsCommand,
    },

    /// 启动交互式 Shell（REPL 模式）
    Shell,

    /// 停止电机
    Stop {
        #[command(flatten)]
        args: StopCommand,
    },

    /// 回零
    Home {
        #[command(flatten)]
        args: HomeCommand,
    },

    /// 移动到指定角度
    Move {
        #[command(flatten)]
        args: MoveCommand,
    },
}

fn main() -> Result<()> {
    // 日志输出到 stderr，不干扰命令输出
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("motor_cli=info,motor_driver=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref())?;
    tracing::debug!("Using config file {}", config_path.display());

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&config_path),

        Commands::Ports { args } => args.execute(),

        Commands::Shell => {
            let config = CliConfig::load(&config_path)?;
            run_repl(config)
        },

        Commands::Stop { args } => {
            let mode = OneShotMode::new(CliConfig::load(&config_path)?);
            args.execute(&mode)
        },

        Commands::Home { args } => {
            let mode = OneShotMode::new(CliConfig::load(&config_path)?);
            args.execute(&mode)
        },

        Commands::Move { args } => {
            let mode = OneShotMode::new(CliConfig::load(&config_path)?);
            args.execute(&mode)
        },
    }
}

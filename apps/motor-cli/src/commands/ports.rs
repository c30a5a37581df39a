//! 串口列表命令

use anyhow::{Context, Result};
use clap::Args;

/// 串口列表参数
#[derive(Args, Debug)]
pub struct PortsCommand {
    /// 只输出端口名（便于脚本使用）
    #[arg(short, long)]
    pub quiet: bool,
}

impl PortsCommand {
    pub fn execute(&self) -> Result<()> {
        let ports = motor_link::list_ports().context("枚举串口失败")?;

        if ports.is_empty() {
            if !self.quiet {
                println!("未发现串口");
            }
            return Ok(());
        }

        for port in &ports {
            if self.quiet {
                println!("{}", port.name);
            } else {
                println!("  {:<20} {}", port.name, port.description);
            }
        }
        Ok(())
    }
}

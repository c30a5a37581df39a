//! 停止命令
//!
//! 发送 `PARAR`，然后优雅断开（断开流程会再发送 `PARAR`/`DESABILITAR`）

use anyhow::Result;
use clap::Args;

use crate::modes::oneshot::OneShotMode;

/// 停止命令参数
#[derive(Args, Debug)]
pub struct StopCommand {
    /// 串口（覆盖配置）
    #[arg(short, long)]
    pub port: Option<String>,
}

impl StopCommand {
    pub fn execute(&self, mode: &OneShotMode) -> Result<()> {
        let connection = mode.connect(self.port.as_deref())?;

        println!("🛑 发送停止命令...");
        connection.controller().stop()?;
        connection.settle(mode.settle_window());

        connection.close();
        println!("✅ 已停止");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_command_creation() {
        let cmd = StopCommand {
            port: Some("/dev/ttyUSB0".to_string()),
        };
        assert_eq!(cmd.port.as_deref(), Some("/dev/ttyUSB0"));
    }
}

//! 回零命令

use anyhow::Result;
use clap::Args;
use motor_driver::HomingState;
use std::time::Duration;

use crate::modes::oneshot::OneShotMode;

/// 回零命令参数
#[derive(Args, Debug)]
pub struct HomeCommand {
    /// 串口（覆盖配置）
    #[arg(short, long)]
    pub port: Option<String>,

    /// 等待回零完成的最长时间（秒）
    #[arg(short, long, default_value_t = 30)]
    pub timeout: u64,
}

impl HomeCommand {
    pub fn execute(&self, mode: &OneShotMode) -> Result<()> {
        let connection = mode.connect(self.port.as_deref())?;
        let controller = connection.controller();

        println!("⚡ 使能电机...");
        controller.toggle_motor_power()?;

        println!("🏠 开始回零...");
        controller.go_home()?;

        let finished = connection.wait_for(Duration::from_secs(self.timeout), |snapshot| {
            matches!(snapshot.homing, HomingState::Homed | HomingState::Error)
        });
        let homing = controller.snapshot().homing;

        connection.close();
        match (finished, homing) {
            (true, HomingState::Homed) => {
                println!("✅ 回零完成");
                Ok(())
            },
            (true, state) => anyhow::bail!("回零失败: {state}"),
            (false, _) => anyhow::bail!("回零超时（{} 秒）", self.timeout),
        }
    }
}

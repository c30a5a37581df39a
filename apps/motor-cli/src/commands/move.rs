//! 移动命令

use anyhow::Result;
use clap::Args;
use motor_driver::SessionSnapshot;
use motor_protocol::Command;
use std::time::Duration;

use crate::modes::oneshot::OneShotMode;

/// 移动命令参数
#[derive(Args, Debug)]
pub struct MoveCommand {
    /// 目标角度（度，0-360）
    #[arg(short, long)]
    pub angle: f64,

    /// 步进频率（Hz，1-200，默认使用配置值）
    #[arg(short, long)]
    pub frequency: Option<u32>,

    /// 串口（覆盖配置）
    #[arg(short, long)]
    pub port: Option<String>,

    /// 等待运动结束的最长时间（秒）
    #[arg(short, long, default_value_t = 30)]
    pub timeout: u64,
}

impl MoveCommand {
    /// 连接前先校验参数，非法输入不会打开串口
    pub fn validate(&self, default_frequency: u32) -> Result<Command> {
        let frequency = self.frequency.unwrap_or(default_frequency);
        Ok(Command::move_angle(self.angle, frequency)?)
    }

    pub fn execute(&self, mode: &OneShotMode) -> Result<()> {
        let frequency = self.frequency.unwrap_or(mode.config().frequency_hz());
        let command = self.validate(frequency)?;

        let connection = mode.connect(self.port.as_deref())?;
        let controller = connection.controller();

        println!("⚡ 使能电机...");
        controller.toggle_motor_power()?;

        println!("⏳ {command}");
        controller.move_by_angle(self.angle, frequency)?;

        let finished = connection.wait_for(Duration::from_secs(self.timeout), |snapshot| {
            !snapshot.motion_in_progress
        });
        let snapshot = controller.snapshot();

        connection.close();
        self.outcome(finished, &snapshot)?;
        println!("✅ 已到达 {}°", self.angle);
        Ok(())
    }

    /// 根据等待结果判断移动是否成功
    fn outcome(&self, finished: bool, snapshot: &SessionSnapshot) -> Result<()> {
        // 断开流程同样会清除移动状态
        if !snapshot.connected {
            anyhow::bail!("移动过程中连接丢失");
        }
        if !finished {
            anyhow::bail!("移动超时（{} 秒）", self.timeout);
        }
        if snapshot.limit_switch_active {
            anyhow::bail!("移动被限位开关中止");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(angle: f64, frequency: Option<u32>) -> MoveCommand {
        MoveCommand {
            angle,
            frequency,
            port: None,
            timeout: 30,
        }
    }

    #[test]
    fn test_validate_uses_default_frequency() {
        let command = cmd(90.0, None).validate(50).unwrap();
        assert_eq!(command.to_line(), "MOVER ANGULO 90.0 50");
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(cmd(400.0, None).validate(50).is_err());
        assert!(cmd(90.0, Some(201)).validate(50).is_err());
    }

    #[test]
    fn test_outcome() {
        let connected = SessionSnapshot {
            connected: true,
            motor_enabled: true,
            ..Default::default()
        };
        assert!(cmd(90.0, None).outcome(true, &connected).is_ok());

        let err = cmd(90.0, None).outcome(false, &connected).unwrap_err();
        assert!(err.to_string().contains("30"));

        let tripped = SessionSnapshot {
            limit_switch_active: true,
            ..connected.clone()
        };
        assert!(cmd(90.0, None).outcome(true, &tripped).is_err());

        let lost = SessionSnapshot::default();
        assert!(cmd(90.0, None).outcome(true, &lost).is_err());
        assert!(cmd(90.0, None).outcome(false, &lost).is_err());
    }
}

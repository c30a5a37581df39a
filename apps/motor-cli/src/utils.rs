//! 输出格式化和端口选择

use anyhow::{Context, Result};
use motor_driver::{CalibrationResult, DisconnectReason, HomingState, Notification};

use crate::commands::config::CliConfig;

/// 选择串口：显式参数 > 配置中且当前存在的串口 > 第一个可用串口
pub fn choose_port(explicit: Option<&str>, config: &CliConfig) -> Result<String> {
    if let Some(port) = explicit {
        return Ok(port.to_string());
    }

    let ports = motor_link::list_ports().context("枚举串口失败")?;
    match motor_link::preferred_port(&ports, config.port.as_deref()) {
        Some(port) => Ok(port.to_string()),
        // 配置了串口但枚举不到（例如虚拟串口），仍然尝试打开
        None => config
            .port
            .clone()
            .ok_or_else(|| anyhow::anyhow!("未发现串口，请使用 --port 指定")),
    }
}

/// 把会话通知格式化为一行终端输出
pub fn describe_notification(notification: &Notification) -> String {
    match notification {
        Notification::PowerStateChanged { enabled: true } => "⚡ 电机已使能".to_string(),
        Notification::PowerStateChanged { enabled: false } => "💤 电机已失能".to_string(),
        Notification::LimitSwitchChanged { active: true } => "🚨 限位开关触发！".to_string(),
        Notification::LimitSwitchChanged { active: false } => "✅ 限位开关: OK".to_string(),
        Notification::HomingStateChanged(state) => match state {
            HomingState::NotHomed => "🏠 回零: 未回零".to_string(),
            HomingState::InProgress => "🏠 回零: 进行中...".to_string(),
            HomingState::Homed => "🏠 回零: 完成".to_string(),
            HomingState::Error => "🏠 回零: 错误！".to_string(),
        },
        Notification::AngleControlsAvailabilityChanged { enabled } => {
            if *enabled {
                "🎛  角度控制: 可用".to_string()
            } else {
                "🔒 角度控制: 锁定".to_string()
            }
        },
        Notification::CalibrationPhaseChanged { phase, step } => {
            format!(
                "📐 校准: {phase} ({step}/{})",
                motor_protocol::CALIBRATION_POINT_COUNT
            )
        },
        Notification::CalibrationOutcome {
            result: CalibrationResult::Success,
            detail,
        } => format!("✅ 校准完成: {detail}"),
        Notification::CalibrationOutcome {
            result: CalibrationResult::Failure,
            detail,
        } => format!("❌ 校准失败: {detail}"),
        Notification::DeviceReportedError { line } => format!("⚠️  控制器错误: {line}"),
        Notification::ConnectionClosed {
            reason: DisconnectReason::Requested,
        } => "🔌 已断开".to_string(),
        Notification::ConnectionClosed { reason } => format!("🔌 连接丢失: {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motor_driver::CalibrationPhase;

    #[test]
    fn test_explicit_port_wins() {
        let config = CliConfig {
            port: Some("/dev/ttyACM0".to_string()),
            ..Default::default()
        };
        assert_eq!(
            choose_port(Some("/dev/ttyUSB1"), &config).unwrap(),
            "/dev/ttyUSB1"
        );
    }

    #[test]
    fn test_describe_notification() {
        assert_eq!(
            describe_notification(&Notification::CalibrationPhaseChanged {
                phase: CalibrationPhase::AwaitingMove,
                step: 1,
            }),
            "📐 校准: awaiting move (1/3)"
        );
        assert!(
            describe_notification(&Notification::ConnectionClosed {
                reason: DisconnectReason::TransportFailed("Link closed".into()),
            })
            .contains("transport failed: Link closed")
        );
        assert!(
            describe_notification(&Notification::DeviceReportedError {
                line: "NACK_X".into()
            })
            .contains("NACK_X")
        );
    }
}

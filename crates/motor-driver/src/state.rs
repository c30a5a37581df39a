//! 会话状态定义
//!
//! [`SessionSnapshot`] 是会话在某一时刻的只读视图，供 CLI 和观察者使用。

use crate::calibration::CalibrationPhase;
use motor_protocol::CalibrationPoint;
use std::fmt;

/// 回零状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HomingState {
    /// 未回零（每次新连接的初始状态）
    #[default]
    NotHomed,
    /// 回零进行中（强制禁用角度控制）
    InProgress,
    /// 已回零
    Homed,
    /// 回零过程中控制器报错
    Error,
}

impl fmt::Display for HomingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            HomingState::NotHomed => "not homed",
            HomingState::InProgress => "homing",
            HomingState::Homed => "homed",
            HomingState::Error => "homing error",
        };
        f.write_str(text)
    }
}

/// 会话快照
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub connected: bool,
    pub motor_enabled: bool,
    pub limit_switch_active: bool,
    /// 已发出移动指令，尚未收到运动结束应答
    pub motion_in_progress: bool,
    pub homing: HomingState,
    pub angle_controls_enabled: bool,
    pub calibration_phase: CalibrationPhase,
    /// 已采集的校准点数（等于 `calibration_points.len()`）
    pub calibration_step: usize,
    pub calibration_points: Vec<CalibrationPoint>,
}

impl fmt::Display for SessionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "link:        {}",
            if self.connected { "connected" } else { "disconnected" }
        )?;
        writeln!(f, "motor:       {}", if self.motor_enabled { "ON" } else { "OFF" })?;
        writeln!(
            f,
            "limit:       {}",
            if self.limit_switch_active { "TRIPPED" } else { "clear" }
        )?;
        writeln!(
            f,
            "motion:      {}",
            if self.motion_in_progress { "moving" } else { "idle" }
        )?;
        writeln!(f, "homing:      {}", self.homing)?;
        writeln!(
            f,
            "angle ctrl:  {}",
            if self.angle_controls_enabled { "enabled" } else { "locked" }
        )?;
        write!(
            f,
            "calibration: {} ({}/{})",
            self.calibration_phase,
            self.calibration_step,
            motor_protocol::CALIBRATION_POINT_COUNT
        )?;
        for point in &self.calibration_points {
            write!(f, "\n  - {point}")?;
        }
        Ok(())
    }
}

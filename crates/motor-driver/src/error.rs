//! 会话层错误类型定义

use crate::calibration::CalibrationPhase;
use motor_link::LinkError;
use motor_protocol::{CALIBRATION_POINT_COUNT, ProtocolError};
use thiserror::Error;

/// 操作员动作的同步拒绝原因
///
/// - `Validation`: 输入超出范围，本地拒绝，不产生串口流量，会话状态不变
/// - `NotReady`: 当前状态不允许该动作，本地拒绝
/// - `Transport`: 发送失败，会话已执行断开流程
#[derive(Error, Debug)]
pub enum SessionError {
    /// 输入校验失败
    #[error("Validation error: {0}")]
    Validation(#[from] ProtocolError),

    /// 状态不满足
    #[error("Not ready: {0}")]
    NotReady(NotReadyReason),

    /// 链路错误
    #[error("Transport error: {0}")]
    Transport(#[from] LinkError),
}

impl SessionError {
    /// 未就绪原因（如果是 `NotReady`）
    pub fn not_ready_reason(&self) -> Option<&NotReadyReason> {
        match self {
            SessionError::NotReady(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SessionError::Validation(_))
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, SessionError::NotReady(_))
    }
}

impl From<NotReadyReason> for SessionError {
    fn from(reason: NotReadyReason) -> Self {
        SessionError::NotReady(reason)
    }
}

/// 未就绪原因
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    #[error("not connected")]
    NotConnected,

    #[error("motor not enabled")]
    MotorNotEnabled,

    #[error("homing in progress")]
    HomingInProgress,

    #[error("calibration in progress")]
    CalibrationActive,

    #[error("calibration not started")]
    CalibrationNotActive,

    #[error("calibration is {actual}, expected {expected}")]
    WrongCalibrationPhase {
        expected: CalibrationPhase,
        actual: CalibrationPhase,
    },

    #[error("all {} calibration points already collected", CALIBRATION_POINT_COUNT)]
    AllPointsCollected,

    #[error("only {collected} of {} calibration points collected", CALIBRATION_POINT_COUNT)]
    InsufficientPoints { collected: usize },
}

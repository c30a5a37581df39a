//! 应答行分类
//!
//! 将控制器发来的文本行映射为离散事件（无状态，查表匹配）。
//!
//! # 匹配优先级
//!
//! 1. 精确匹配表（[`EXACT_ACKS`]）
//! 2. 子串匹配表（[`CONTAINS_ACKS`]），按表内顺序
//!
//! `NACK_CALIBRATION_FACTOR_ZERO` 在精确表中，因此优先于通用的 `NACK_` 子串规则。

use std::fmt;

/// 控制器应答事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckEvent {
    /// 限位开关触发
    LimitSwitchTripped,
    /// 限位开关复位
    LimitSwitchCleared,
    /// 运动结束（停止或到位）
    MotionSettled,
    /// 回零开始
    HomingStarted,
    /// 回零完成
    HomingCompleted,
    /// 控制器报告尚未回零
    HomingUnknown,
    /// 通用错误（任意 `NACK_` 行）
    GenericError,
    /// 校准点确认（仅提示，不驱动校准流程）
    CalibrationPointAck,
    /// 校准系数计算成功
    CalibrationSucceeded,
    /// 校准失败：系数为零
    CalibrationFailedZeroFactor,
    /// 校准已重置为默认值
    CalibrationReset,
    /// 未识别的行
    Unknown,
}

impl AckEvent {
    /// 是否为控制器报告的错误
    pub const fn is_device_error(self) -> bool {
        matches!(
            self,
            AckEvent::GenericError | AckEvent::CalibrationFailedZeroFactor
        )
    }
}

impl fmt::Display for AckEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 精确匹配表
pub const EXACT_ACKS: &[(&str, AckEvent)] = &[
    ("WARNING_LIMIT_SWITCH_ACTIVE", AckEvent::LimitSwitchTripped),
    ("WARNING_LIMIT_SWITCH_HIT", AckEvent::LimitSwitchTripped),
    ("ACK_LIMIT_SWITCH_RESET", AckEvent::LimitSwitchCleared),
    ("ACK_PARADO", AckEvent::MotionSettled),
    ("ACK_ANGULO_CONCLUIDO", AckEvent::MotionSettled),
    ("ACK_HOMING_STARTED", AckEvent::HomingStarted),
    ("ACK_HOMING_CONCLUIDO", AckEvent::HomingCompleted),
    ("ACK_NOT_HOMED", AckEvent::HomingUnknown),
    ("ACK_CALIBRATION_COMPLETE", AckEvent::CalibrationSucceeded),
    (
        "NACK_CALIBRATION_FACTOR_ZERO",
        AckEvent::CalibrationFailedZeroFactor,
    ),
    ("ACK_CALIBRATION_RESET", AckEvent::CalibrationReset),
];

/// 子串匹配表（仅在精确匹配失败后按顺序检查）
pub const CONTAINS_ACKS: &[(&str, AckEvent)] = &[
    ("NACK_", AckEvent::GenericError),
    ("ACK_CALIBRATION_POINT", AckEvent::CalibrationPointAck),
];

/// 分类一行应答
///
/// 行首尾空白（含 `\r`）会被忽略。
pub fn classify(line: &str) -> AckEvent {
    let line = line.trim();

    if let Some((_, event)) = EXACT_ACKS.iter().find(|(token, _)| *token == line) {
        return *event;
    }

    CONTAINS_ACKS
        .iter()
        .find(|(token, _)| line.contains(token))
        .map(|(_, event)| *event)
        .unwrap_or(AckEvent::Unknown)
}

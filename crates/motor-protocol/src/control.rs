//! 控制指令构建
//!
//! 将操作员意图映射为控制器可解析的文本指令（无状态格式化）。
//!
//! | 意图 | 指令文本 |
//! |---|---|
//! | 使能电机 | `HABILITAR` |
//! | 去使能电机 | `DESABILITAR` |
//! | 停止 | `PARAR` |
//! | 正向 | `DIR FRENTE` |
//! | 反向 | `DIR RE` |
//! | 按角度移动 | `MOVER ANGULO <deg> <freqHz>` |
//! | 回零 | `HOME` |
//! | 重置校准 | `RESET_CALIB` |
//! | 提交校准 | `CALIBRAR <t1>,<m1>;<t2>,<m2>;<t3>,<m3>` |

use crate::{
    CALIBRATION_POINT_COUNT, ProtocolError, format_decimal, validate_angle, validate_frequency,
};
use std::fmt;

/// 旋转方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 正向（`DIR FRENTE`）
    Forward,
    /// 反向（`DIR RE`）
    Reverse,
}

impl Direction {
    /// 指令中的方向参数
    pub const fn as_wire(self) -> &'static str {
        match self {
            Direction::Forward => "FRENTE",
            Direction::Reverse => "RE",
        }
    }
}

/// 校准点：理论角度与实测角度（度）
///
/// 只能通过 [`CalibrationPoint::new`] 构建，两个分量都保证有限且位于 [0, 360]。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPoint {
    theoretical: f64,
    measured: f64,
}

impl CalibrationPoint {
    /// 创建校准点
    ///
    /// # 错误
    /// - `ProtocolError::NonFinite`: 任一分量为 NaN 或无穷大
    /// - `ProtocolError::AngleOutOfRange`: 任一分量超出 [0, 360]
    pub fn new(theoretical: f64, measured: f64) -> Result<Self, ProtocolError> {
        Ok(Self {
            theoretical: validate_angle("theoretical", theoretical)?,
            measured: validate_angle("measured", measured)?,
        })
    }

    /// 理论角度（度）
    pub fn theoretical(&self) -> f64 {
        self.theoretical
    }

    /// 实测角度（度）
    pub fn measured(&self) -> f64 {
        self.measured
    }
}

impl fmt::Display for CalibrationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{}",
            format_decimal(self.theoretical),
            format_decimal(self.measured)
        )
    }
}

/// 主机 → 控制器指令
///
/// 带参数的变体请使用校验构造器（[`Command::move_angle`]、[`Command::calibrate`]），
/// 以保证发出的指令都在控制器接受范围内。
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// 使能驱动器
    Enable,
    /// 去使能驱动器
    Disable,
    /// 停止当前运动
    Stop,
    /// 设置旋转方向
    SetDirection(Direction),
    /// 以指定频率移动到绝对角度
    MoveAngle { degrees: f64, frequency_hz: u32 },
    /// 执行回零流程
    Home,
    /// 将校准系数重置为默认值
    ResetCalibration,
    /// 提交三点校准数据
    Calibrate([CalibrationPoint; CALIBRATION_POINT_COUNT]),
}

impl Command {
    /// 构建按角度移动指令
    ///
    /// # 错误
    /// - 角度非有限或超出 [0, 360]
    /// - 频率超出 [1, 200] Hz
    pub fn move_angle(degrees: f64, frequency_hz: u32) -> Result<Self, ProtocolError> {
        Ok(Command::MoveAngle {
            degrees: validate_angle("angle", degrees)?,
            frequency_hz: validate_frequency(frequency_hz)?,
        })
    }

    /// 构建校准提交指令
    pub fn calibrate(points: [CalibrationPoint; CALIBRATION_POINT_COUNT]) -> Self {
        Command::Calibrate(points)
    }

    /// 生成指令文本（不含换行符）
    pub fn to_line(&self) -> String {
        self.to_string()
    }

    /// 指令助记名（用于日志）
    pub const fn name(&self) -> &'static str {
        match self {
            Command::Enable => "enable",
            Command::Disable => "disable",
            Command::Stop => "stop",
            Command::SetDirection(_) => "set_direction",
            Command::MoveAngle { .. } => "move_angle",
            Command::Home => "home",
            Command::ResetCalibration => "reset_calibration",
            Command::Calibrate(_) => "calibrate",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Enable => f.write_str("HABILITAR"),
            Command::Disable => f.write_str("DESABILITAR"),
            Command::Stop => f.write_str("PARAR"),
            Command::SetDirection(dir) => write!(f, "DIR {}", dir.as_wire()),
            Command::MoveAngle {
                degrees,
                frequency_hz,
            } => write!(
                f,
                "MOVER ANGULO {} {}",
                format_decimal(*degrees),
                frequency_hz
            ),
            Command::Home => f.write_str("HOME"),
            Command::ResetCalibration => f.write_str("RESET_CALIB"),
            Command::Calibrate(points) => {
                f.write_str("CALIBRAR ")?;
                for (i, point) in points.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    write!(f, "{point}")?;
                }
                Ok(())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(Command::Enable.to_line(), "HABILITAR");
        assert_eq!(Command::Disable.to_line(), "DESABILITAR");
        assert_eq!(Command::Stop.to_line(), "PARAR");
        assert_eq!(Command::Home.to_line(), "HOME");
        assert_eq!(Command::ResetCalibration.to_line(), "RESET_CALIB");
        assert_eq!(
            Command::SetDirection(Direction::Forward).to_line(),
            "DIR FRENTE"
        );
        assert_eq!(Command::SetDirection(Direction::Reverse).to_line(), "DIR RE");
    }

    #[test]
    fn test_move_angle_format() {
        let cmd = Command::move_angle(90.0, 50).unwrap();
        assert_eq!(cmd.to_line(), "MOVER ANGULO 90.0 50");

        let cmd = Command::move_angle(12.75, 200).unwrap();
        assert_eq!(cmd.to_line(), "MOVER ANGULO 12.75 200");

        let cmd = Command::move_angle(-0.0, 50).unwrap();
        assert_eq!(cmd.to_line(), "MOVER ANGULO 0.0 50");
    }

    #[test]
    fn test_move_angle_rejects_out_of_range() {
        assert!(matches!(
            Command::move_angle(361.0, 50),
            Err(ProtocolError::AngleOutOfRange { .. })
        ));
        assert!(matches!(
            Command::move_angle(-1.0, 50),
            Err(ProtocolError::AngleOutOfRange { .. })
        ));
        assert!(matches!(
            Command::move_angle(90.0, 0),
            Err(ProtocolError::FrequencyOutOfRange { .. })
        ));
        assert!(matches!(
            Command::move_angle(90.0, 201),
            Err(ProtocolError::FrequencyOutOfRange { .. })
        ));
        assert!(matches!(
            Command::move_angle(f64::NAN, 50),
            Err(ProtocolError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_calibrate_format_has_no_trailing_separator() {
        let points = [
            CalibrationPoint::new(90.0, 88.5).unwrap(),
            CalibrationPoint::new(180.0, 179.0).unwrap(),
            CalibrationPoint::new(270.0, 271.2).unwrap(),
        ];
        assert_eq!(
            Command::calibrate(points).to_line(),
            "CALIBRAR 90.0,88.5;180.0,179.0;270.0,271.2"
        );
    }

    #[test]
    fn test_calibration_point_validation() {
        assert!(CalibrationPoint::new(0.0, 360.0).is_ok());
        assert_eq!(
            CalibrationPoint::new(90.0, f64::NEG_INFINITY),
            Err(ProtocolError::NonFinite { field: "measured" })
        );
        assert!(matches!(
            CalibrationPoint::new(400.0, 10.0),
            Err(ProtocolError::AngleOutOfRange { .. })
        ));
    }
}

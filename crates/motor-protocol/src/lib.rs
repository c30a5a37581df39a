//! # Motor Protocol
//!
//! 步进电机控制器串口文本协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议常量定义（频率范围、角度范围、默认值）
//! - `control`: 控制指令构建（主机 → 控制器）
//! - `feedback`: 应答行分类（控制器 → 主机）
//!
//! ## 帧格式
//!
//! 所有指令与应答都是 UTF-8 文本行，以单个 `\n` 结尾，无校验、无长度前缀。
//! 换行符由传输层（`motor-link`）追加，本模块只处理行内容。

pub mod constants;
pub mod control;
pub mod feedback;

// 重新导出常用类型
pub use constants::*;
pub use control::*;
pub use feedback::*;

use thiserror::Error;

/// 协议层错误类型
///
/// 所有错误都在本地产生（参数校验），不会触发任何串口流量。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// 角度超出 [0, 360] 范围
    #[error("Angle {value}° out of range [{min}, {max}]")]
    AngleOutOfRange { value: f64, min: f64, max: f64 },

    /// 步进频率超出控制器接受范围
    #[error("Frequency {value} Hz out of range [{min}, {max}]")]
    FrequencyOutOfRange { value: u32, min: u32, max: u32 },

    /// 非有限数值（NaN 或无穷大）
    #[error("Non-finite value for {field}")]
    NonFinite { field: &'static str },
}

/// 将角度格式化为控制器固件可解析的十进制文本
///
/// 整数值也保留一位小数：`90.0` 而不是 `90`。
pub fn format_decimal(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') || text.contains('e') || !value.is_finite() {
        text
    } else {
        format!("{text}.0")
    }
}

/// 校验角度（度）是否有限且位于 [0, 360]
///
/// `-0.0` 归一化为 `0.0`。
pub fn validate_angle(field: &'static str, degrees: f64) -> Result<f64, ProtocolError> {
    if !degrees.is_finite() {
        return Err(ProtocolError::NonFinite { field });
    }
    if !(MIN_ANGLE_DEG..=MAX_ANGLE_DEG).contains(&degrees) {
        return Err(ProtocolError::AngleOutOfRange {
            value: degrees,
            min: MIN_ANGLE_DEG,
            max: MAX_ANGLE_DEG,
        });
    }
    Ok(degrees + 0.0)
}

/// 校验步进频率（Hz）是否在控制器接受范围内
pub fn validate_frequency(frequency_hz: u32) -> Result<u32, ProtocolError> {
    if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&frequency_hz) {
        return Err(ProtocolError::FrequencyOutOfRange {
            value: frequency_hz,
            min: MIN_FREQUENCY_HZ,
            max: MAX_FREQUENCY_HZ,
        });
    }
    Ok(frequency_hz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_decimal_keeps_fraction() {
        assert_eq!(format_decimal(90.0), "90.0");
        assert_eq!(format_decimal(0.0), "0.0");
        assert_eq!(format_decimal(360.0), "360.0");
        assert_eq!(format_decimal(88.5), "88.5");
        assert_eq!(format_decimal(271.2), "271.2");
    }

    #[test]
    fn test_validate_angle_bounds() {
        assert_eq!(validate_angle("angle", 0.0), Ok(0.0));
        assert_eq!(validate_angle("angle", 360.0), Ok(360.0));
        assert!(matches!(
            validate_angle("angle", -0.1),
            Err(ProtocolError::AngleOutOfRange { .. })
        ));
        assert!(matches!(
            validate_angle("angle", 360.01),
            Err(ProtocolError::AngleOutOfRange { .. })
        ));
        assert_eq!(
            validate_angle("measured", f64::NAN),
            Err(ProtocolError::NonFinite { field: "measured" })
        );
        assert_eq!(
            validate_angle("angle", f64::INFINITY),
            Err(ProtocolError::NonFinite { field: "angle" })
        );
    }

    #[test]
    fn test_negative_zero_normalized() {
        let angle = validate_angle("angle", -0.0).unwrap();
        assert!(angle.is_sign_positive());
        assert_eq!(format_decimal(angle), "0.0");
    }

    #[test]
    fn test_validate_frequency_bounds() {
        assert_eq!(validate_frequency(1), Ok(1));
        assert_eq!(validate_frequency(200), Ok(200));
        assert!(validate_frequency(0).is_err());
        assert!(validate_frequency(201).is_err());
    }

    /// 测试 ProtocolError 的 Display 实现
    #[test]
    fn test_protocol_error_display() {
        let err = validate_frequency(500).unwrap_err();
        assert_eq!(err.to_string(), "Frequency 500 Hz out of range [1, 200]");

        let err = validate_angle("angle", 400.0).unwrap_err();
        assert!(err.to_string().contains("400"));
    }
}

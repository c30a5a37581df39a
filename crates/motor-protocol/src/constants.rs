//! 协议常量定义

/// 角度下限（度）
pub const MIN_ANGLE_DEG: f64 = 0.0;

/// 角度上限（度）
pub const MAX_ANGLE_DEG: f64 = 360.0;

/// 控制器接受的最低步进频率（Hz）
pub const MIN_FREQUENCY_HZ: u32 = 1;

/// 控制器接受的最高步进频率（Hz）
pub const MAX_FREQUENCY_HZ: u32 = 200;

/// 手动移动的默认步进频率（Hz）
pub const DEFAULT_FREQUENCY_HZ: u32 = 50;

/// 校准移动使用的固定步进频率（Hz）
pub const CALIBRATION_FREQUENCY_HZ: u32 = 50;

/// 三点校准所需的点数
pub const CALIBRATION_POINT_COUNT: usize = 3;

/// 控制器串口默认波特率
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

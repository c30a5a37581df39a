//! # Motor Driver
//!
//! 步进电机控制器的会话层：
//! - 设备会话状态机（电机使能、限位开关、回零、角度控制门控）
//! - 三点校准序列
//! - 通知钩子（观察者模式）
//! - 接收线程与优雅断开
//!
//! 大多数使用者只需要 [`MotorBuilder`] 和 [`MotorController`]。
//!
//! ```no_run
//! use motor_driver::{ChannelSink, MotorBuilder};
//! use std::sync::Arc;
//!
//! let (sink, notifications) = ChannelSink::new();
//! let controller = MotorBuilder::new()
//!     .port("/dev/ttyUSB0")
//!     .sink(Arc::new(sink))
//!     .build()
//!     .unwrap();
//!
//! controller.toggle_motor_power().unwrap();
//! controller.move_by_angle(90.0, 50).unwrap();
//! for notification in notifications.try_iter() {
//!     println!("{notification:?}");
//! }
//! ```

mod builder;
pub mod calibration;
mod controller;
mod error;
pub mod hooks;
pub mod metrics;
pub mod pipeline;
mod session;
pub mod state;

pub use builder::MotorBuilder;
pub use calibration::{CalibrationPhase, CalibrationSequence, suggested_theoretical};
pub use controller::MotorController;
pub use error::{NotReadyReason, SessionError};
pub use hooks::{
    CalibrationResult, ChannelSink, DisconnectReason, HookManager, Notification, NotificationSink,
};
pub use metrics::{LinkMetrics, MetricsSnapshot};
pub use pipeline::{DriverConfig, rx_loop};
pub use session::DeviceSession;
pub use state::{HomingState, SessionSnapshot};

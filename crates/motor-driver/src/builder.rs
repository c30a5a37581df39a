//! Builder 模式实现
//!
//! 提供链式构造 `MotorController` 实例的便捷方式。

use crate::controller::MotorController;
use crate::hooks::{HookManager, NotificationSink};
use crate::pipeline::DriverConfig;
use motor_link::{
    LinkDeviceError, LinkDeviceErrorKind, LinkError, SerialLink, SplittableLink, list_ports,
    preferred_port,
};
use motor_protocol::DEFAULT_BAUD_RATE;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// MotorController Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use motor_driver::{DriverConfig, MotorBuilder};
///
/// // 自动选择第一个可用串口
/// let controller = MotorBuilder::new().build().unwrap();
///
/// // 指定串口和轮询间隔
/// let controller = MotorBuilder::new()
///     .port("/dev/ttyUSB0")
///     .driver_config(DriverConfig { poll_interval_ms: 20, ..Default::default() })
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct MotorBuilder {
    /// 串口路径；未设置时自动选择
    port: Option<String>,
    /// 波特率（默认 115200）
    baud_rate: Option<u32>,
    /// 串口读超时（默认 100ms）
    read_timeout: Option<Duration>,
    driver_config: Option<DriverConfig>,
    hooks: HookManager,
}

impl MotorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置串口路径（如 `/dev/ttyUSB0`、`COM3`）
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn driver_config(mut self, config: DriverConfig) -> Self {
        self.driver_config = Some(config);
        self
    }

    /// 接收轮询间隔（毫秒）
    pub fn poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        let mut config = self.driver_config.unwrap_or_default();
        config.poll_interval_ms = poll_interval_ms;
        self.driver_config = Some(config);
        self
    }

    /// 注册通知接收端（可多次调用）
    pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.hooks.add_sink(sink);
        self
    }

    /// 打开串口并启动控制器
    ///
    /// 未指定串口时，使用枚举到的第一个串口；没有串口时返回 `NotFound`。
    pub fn build(self) -> Result<MotorController, LinkError> {
        let port = match self.port.clone() {
            Some(port) => port,
            None => {
                let ports = list_ports()?;
                preferred_port(&ports, None).map(str::to_string).ok_or_else(|| {
                    LinkDeviceError::new(LinkDeviceErrorKind::NotFound, "no serial port available")
                })?
            },
        };
        let baud_rate = self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE);
        let read_timeout = self.read_timeout.unwrap_or(motor_link::serial::DEFAULT_READ_TIMEOUT);

        let link = SerialLink::open(&port, baud_rate, read_timeout)?;
        info!("Connected to {port} at {baud_rate} baud");
        self.build_with_link(link)
    }

    /// 使用任意可拆分链路启动控制器（测试时传入 Mock 链路）
    pub fn build_with_link<L: SplittableLink>(self, link: L) -> Result<MotorController, LinkError> {
        MotorController::start(link, self.hooks, self.driver_config.unwrap_or_default())
    }
}

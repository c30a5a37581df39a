//! One-shot 模式
//!
//! 每个命令独立执行：
//! 1. 读取配置
//! 2. 连接控制器
//! 3. 执行操作，在短暂的等待窗口内打印控制器应答
//! 4. 优雅断开

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use motor_driver::{ChannelSink, MotorBuilder, MotorController, Notification, SessionSnapshot};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::commands::config::CliConfig;
use crate::utils;

/// 默认等待窗口（毫秒）
const DEFAULT_SETTLE_MS: u64 = 1500;

/// One-shot 模式
pub struct OneShotMode {
    config: CliConfig,
    settle_window: Duration,
}

impl OneShotMode {
    pub fn new(config: CliConfig) -> Self {
        Self {
            config,
            settle_window: Duration::from_millis(DEFAULT_SETTLE_MS),
        }
    }

    pub fn config(&self) -> &CliConfig {
        &self.config
    }

    pub fn settle_window(&self) -> Duration {
        self.settle_window
    }

    /// 连接到控制器（命令行参数优先于配置）
    pub fn connect(&self, port: Option<&str>) -> Result<Connection> {
        let port = utils::choose_port(port, &self.config)?;
        println!("⏳ 连接到 {port}...");

        let (sink, notifications) = ChannelSink::new();
        let controller = MotorBuilder::new()
            .port(port.as_str())
            .baud_rate(self.config.baud_rate())
            .poll_interval_ms(self.config.poll_interval_ms())
            .sink(Arc::new(sink))
            .build()
            .with_context(|| format!("无法连接到 {port}"))?;

        println!("✅ 已连接");
        Ok(Connection {
            controller,
            notifications,
        })
    }
}

/// 一次性连接
pub struct Connection {
    controller: MotorController,
    notifications: Receiver<Notification>,
}

impl Connection {
    pub fn controller(&self) -> &MotorController {
        &self.controller
    }

    /// 在等待窗口内打印通知
    pub fn settle(&self, window: Duration) {
        let deadline = Instant::now() + window;
        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            match self.notifications.recv_timeout(remaining) {
                Ok(notification) => println!("{}", utils::describe_notification(&notification)),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// 等待会话满足条件，期间打印通知；超时返回 `false`
    pub fn wait_for(&self, timeout: Duration, done: impl Fn(&SessionSnapshot) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let snapshot = self.controller.snapshot();
            if done(&snapshot) {
                return true;
            }
            if !snapshot.connected {
                return false;
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return false;
            };
            match self
                .notifications
                .recv_timeout(remaining.min(Duration::from_millis(100)))
            {
                Ok(notification) => println!("{}", utils::describe_notification(&notification)),
                Err(RecvTimeoutError::Timeout) => {},
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    /// 优雅断开并打印剩余通知
    pub fn close(self) {
        let Connection {
            mut controller,
            notifications,
        } = self;
        controller.disconnect();
        for notification in notifications.try_iter() {
            println!("{}", utils::describe_notification(&notification));
        }
    }
}

//! # Motor Link Adapter Layer
//!
//! 行传输抽象层，为上层提供统一的“发送一行 / 接收一行”接口。
//!
//! - [`LineTx`]: 发送半部（操作员线程使用）
//! - [`LineRx`]: 接收半部（后台接收线程独占）
//! - [`SplittableLink`]: 可以拆分为收发两半的完整链路
//!
//! 超时不是错误：`receive_line` 在无数据时返回 `Ok(None)`。

use std::time::Duration;
use thiserror::Error;

pub mod serial;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use serial::{PortSummary, SerialLink, SerialRx, SerialTx, list_ports, preferred_port};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockLink, MockLinkHandle, MockRx, MockTx};

/// 链路层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("Link closed")]
    Closed,
    #[error("Device Error: {0}")]
    Device(#[from] LinkDeviceError),
}

impl LinkError {
    /// 是否为链路已关闭（主动关闭或对端断开）
    pub fn is_closed(&self) -> bool {
        matches!(self, LinkError::Closed)
    }
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDeviceErrorKind {
    Unknown,
    NotFound,
    AccessDenied,
    Disconnected,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct LinkDeviceError {
    pub kind: LinkDeviceErrorKind,
    pub message: String,
}

impl LinkDeviceError {
    pub fn new(kind: LinkDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&str> for LinkDeviceError {
    fn from(message: &str) -> Self {
        Self::new(LinkDeviceErrorKind::Unknown, message)
    }
}

/// 发送半部
pub trait LineTx: Send {
    /// 发送一行文本（由实现追加单个 `\n`）
    fn send_line(&mut self, line: &str) -> Result<(), LinkError>;

    /// 关闭链路（幂等）
    ///
    /// 关闭后接收半部应在下一次轮询时返回 [`LinkError::Closed`]。
    fn close(&mut self);
}

/// 接收半部
pub trait LineRx: Send {
    /// 接收一行文本（已去除行终止符）
    ///
    /// - `Ok(Some(line))`: 收到一行
    /// - `Ok(None)`: 超时（正常情况）
    /// - `Err(_)`: 链路关闭或损坏
    fn receive_line(&mut self, timeout: Duration) -> Result<Option<String>, LinkError>;
}

/// 可拆分为收发两半的链路
pub trait SplittableLink {
    type Rx: LineRx + 'static;
    type Tx: LineTx + 'static;

    fn split(self) -> Result<(Self::Rx, Self::Tx), LinkError>;
}

impl<T: LineTx + ?Sized> LineTx for Box<T> {
    fn send_line(&mut self, line: &str) -> Result<(), LinkError> {
        (**self).send_line(line)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

//! 通知钩子（Hook System）
//!
//! 会话状态每次变化都会生成一条 [`Notification`]，由 [`HookManager`] 分发给所有
//! 已注册的 [`NotificationSink`]。
//!
//! # 设计原则
//!
//! - **非阻塞**: 分发发生在会话锁内，Sink 必须立即返回
//! - **只读**: Sink 只观察状态，不能修改会话
//! - **Channel 模式**: 需要耗时处理（打印、渲染）时使用 [`ChannelSink`] 转发到其他线程
//!
//! ```rust
//! use motor_driver::hooks::{ChannelSink, HookManager, Notification, NotificationSink};
//! use std::sync::Arc;
//!
//! let mut hooks = HookManager::new();
//! let (sink, rx) = ChannelSink::new();
//! hooks.add_sink(Arc::new(sink));
//!
//! hooks.trigger_all(&Notification::PowerStateChanged { enabled: true });
//! assert_eq!(rx.try_recv().unwrap(), Notification::PowerStateChanged { enabled: true });
//! ```

use crate::calibration::CalibrationPhase;
use crate::state::HomingState;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 校准结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationResult {
    Success,
    Failure,
}

/// 连接关闭原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// 操作员主动断开
    Requested,
    /// 链路收发失败
    TransportFailed(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Requested => f.write_str("requested by operator"),
            DisconnectReason::TransportFailed(detail) => write!(f, "transport failed: {detail}"),
        }
    }
}

/// 状态变化通知
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// 电机使能状态变化
    PowerStateChanged { enabled: bool },
    /// 限位开关状态变化
    LimitSwitchChanged { active: bool },
    /// 回零状态变化
    HomingStateChanged(HomingState),
    /// 角度控制可用性变化
    AngleControlsAvailabilityChanged { enabled: bool },
    /// 校准阶段变化（`step` 为已采集点数）
    CalibrationPhaseChanged {
        phase: CalibrationPhase,
        step: usize,
    },
    /// 校准最终结果
    CalibrationOutcome {
        result: CalibrationResult,
        detail: String,
    },
    /// 控制器报告错误（`NACK_*`）
    DeviceReportedError { line: String },
    /// 连接已关闭，会话进入 Disconnected
    ConnectionClosed { reason: DisconnectReason },
}

/// 通知接收端
///
/// # 性能要求
///
/// - 在会话锁内调用，必须立即返回
/// - 禁止阻塞操作（I/O、等待锁）
/// - 推荐使用 `try_send` 转发
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &Notification);
}

impl<F> NotificationSink for F
where
    F: Fn(&Notification) + Send + Sync,
{
    fn notify(&self, notification: &Notification) {
        self(notification)
    }
}

/// 钩子管理器
///
/// 回调列表本身不是线程安全的，由会话锁保护。
#[derive(Default, Clone)]
pub struct HookManager {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl HookManager {
    /// 创建新的钩子管理器
    #[must_use]
    pub const fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// 添加接收端
    pub fn add_sink(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    /// 分发给所有接收端
    pub fn trigger_all(&self, notification: &Notification) {
        for sink in self.sinks.iter() {
            sink.notify(notification);
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl fmt::Debug for HookManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookManager").field("sinks", &self.sinks.len()).finish()
    }
}

/// 基于有界 Channel 的通知接收端
///
/// 队列满时丢弃通知而不是阻塞会话，丢弃数量可通过 [`ChannelSink::dropped`] 监控。
pub struct ChannelSink {
    tx: Sender<Notification>,
    dropped: Arc<AtomicU64>,
}

impl ChannelSink {
    /// 默认队列容量
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// 使用默认容量创建
    pub fn new() -> (Self, Receiver<Notification>) {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// 使用指定容量创建
    pub fn with_capacity(capacity: usize) -> (Self, Receiver<Notification>) {
        let (tx, rx) = bounded(capacity);
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// 丢弃计数器
    pub fn dropped(&self) -> &Arc<AtomicU64> {
        &self.dropped
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: &Notification) {
        match self.tx.try_send(notification.clone()) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            },
        }
    }
}

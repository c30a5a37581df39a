//! 链路指标模块
//!
//! 原子计数器，用于监控串口链路的健康状态。任何线程都可以读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 链路实时指标
///
/// ```rust
/// use motor_driver::LinkMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = LinkMetrics::new();
/// metrics.lines_received.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().lines_received, 1);
/// ```
#[derive(Debug, Default)]
pub struct LinkMetrics {
    /// 收到的应答行总数
    pub lines_received: AtomicU64,

    /// 无法识别的行数（已记录日志后忽略）
    pub unrecognized_lines: AtomicU64,

    /// 空轮询次数（超时，正常现象）
    pub idle_polls: AtomicU64,

    /// 成功发送的指令数
    pub commands_sent: AtomicU64,

    /// 发送失败次数（每次都会触发断开流程）
    pub send_failures: AtomicU64,
}

impl LinkMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_received: self.lines_received.load(Ordering::Relaxed),
            unrecognized_lines: self.unrecognized_lines.load(Ordering::Relaxed),
            idle_polls: self.idle_polls.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub lines_received: u64,
    pub unrecognized_lines: u64,
    pub idle_polls: u64,
    pub commands_sent: u64,
    pub send_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let metrics = LinkMetrics::new();
        metrics.commands_sent.fetch_add(3, Ordering::Relaxed);
        metrics.unrecognized_lines.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.commands_sent, 3);
        assert_eq!(snapshot.unrecognized_lines, 1);
        assert_eq!(snapshot.lines_received, 0);
        assert_eq!(LinkMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}

//! Mock 链路（无硬件依赖，用于测试）
//!
//! 通过 [`MockLinkHandle`] 模拟控制器：推送应答行、检查已发送指令、注入故障。
//!
//! ```rust,ignore
//! use motor_link::{LineRx, LineTx, MockLink, SplittableLink};
//! use std::time::Duration;
//!
//! let (link, handle) = MockLink::new();
//! let (mut rx, mut tx) = link.split().unwrap();
//!
//! tx.send_line("HABILITAR").unwrap();
//! assert_eq!(handle.sent_lines(), vec!["HABILITAR".to_string()]);
//!
//! handle.push_line("ACK_PARADO");
//! let line = rx.receive_line(Duration::from_millis(10)).unwrap();
//! assert_eq!(line.as_deref(), Some("ACK_PARADO"));
//! ```

use crate::{LineRx, LineTx, LinkDeviceError, LinkDeviceErrorKind, LinkError, SplittableLink};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
struct MockShared {
    sent: Mutex<Vec<String>>,
    closed: AtomicBool,
    fail_sends: AtomicBool,
    fail_receives: AtomicBool,
    close_calls: AtomicUsize,
}

/// Mock 链路（未拆分）
pub struct MockLink {
    inbound: Receiver<String>,
    shared: Arc<MockShared>,
}

/// 测试侧句柄
#[derive(Clone)]
pub struct MockLinkHandle {
    inbound: Sender<String>,
    shared: Arc<MockShared>,
}

impl MockLink {
    /// 创建 Mock 链路和对应的测试句柄
    pub fn new() -> (Self, MockLinkHandle) {
        let (inbound_tx, inbound_rx) = unbounded();
        let shared = Arc::new(MockShared::default());
        (
            Self {
                inbound: inbound_rx,
                shared: shared.clone(),
            },
            MockLinkHandle {
                inbound: inbound_tx,
                shared,
            },
        )
    }
}

impl SplittableLink for MockLink {
    type Rx = MockRx;
    type Tx = MockTx;

    fn split(self) -> Result<(MockRx, MockTx), LinkError> {
        Ok((
            MockRx {
                inbound: self.inbound,
                shared: self.shared.clone(),
            },
            MockTx {
                shared: self.shared,
            },
        ))
    }
}

impl MockLinkHandle {
    /// 模拟控制器发出一行应答
    pub fn push_line(&self, line: &str) {
        let _ = self.inbound.send(line.to_string());
    }

    /// 已发送的所有指令（按发送顺序）
    pub fn sent_lines(&self) -> Vec<String> {
        self.shared.sent.lock().clone()
    }

    /// 最后一条已发送指令
    pub fn last_sent(&self) -> Option<String> {
        self.shared.sent.lock().last().cloned()
    }

    /// 清空已发送记录
    pub fn clear_sent(&self) {
        self.shared.sent.lock().clear();
    }

    /// 让后续发送失败
    pub fn fail_sends(&self, fail: bool) {
        self.shared.fail_sends.store(fail, Ordering::Release);
    }

    /// 让后续接收失败（模拟拔线）
    pub fn fail_receives(&self, fail: bool) {
        self.shared.fail_receives.store(fail, Ordering::Release);
    }

    /// 链路是否已被关闭
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// `close()` 被调用的次数
    pub fn close_calls(&self) -> usize {
        self.shared.close_calls.load(Ordering::Acquire)
    }
}

/// Mock 接收半部
pub struct MockRx {
    inbound: Receiver<String>,
    shared: Arc<MockShared>,
}

impl LineRx for MockRx {
    fn receive_line(&mut self, timeout: Duration) -> Result<Option<String>, LinkError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(LinkError::Closed);
        }
        if self.shared.fail_receives.load(Ordering::Acquire) {
            return Err(LinkError::Device(LinkDeviceError::new(
                LinkDeviceErrorKind::Disconnected,
                "mock device disconnected",
            )));
        }

        match self.inbound.recv_timeout(timeout) {
            Ok(line) => Ok(Some(line.trim().to_string())),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(LinkError::Closed),
        }
    }
}

/// Mock 发送半部
pub struct MockTx {
    shared: Arc<MockShared>,
}

impl LineTx for MockTx {
    fn send_line(&mut self, line: &str) -> Result<(), LinkError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(LinkError::Closed);
        }
        if self.shared.fail_sends.load(Ordering::Acquire) {
            return Err(LinkError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }
        self.shared.sent.lock().push(line.to_string());
        Ok(())
    }

    fn close(&mut self) {
        self.shared.close_calls.fetch_add(1, Ordering::AcqRel);
        self.shared.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_round_trip() {
        let (link, handle) = MockLink::new();
        let (mut rx, mut tx) = link.split().unwrap();

        assert_eq!(rx.receive_line(Duration::from_millis(1)).unwrap(), None);

        handle.push_line("ACK_PARADO\r");
        assert_eq!(
            rx.receive_line(Duration::from_millis(10)).unwrap().as_deref(),
            Some("ACK_PARADO")
        );

        tx.send_line("PARAR").unwrap();
        assert_eq!(handle.last_sent().as_deref(), Some("PARAR"));
    }

    #[test]
    fn test_close_stops_both_halves() {
        let (link, handle) = MockLink::new();
        let (mut rx, mut tx) = link.split().unwrap();

        tx.close();
        tx.close();
        assert!(handle.is_closed());
        assert_eq!(handle.close_calls(), 2);
        assert!(matches!(tx.send_line("PARAR"), Err(LinkError::Closed)));
        assert!(matches!(
            rx.receive_line(Duration::from_millis(1)),
            Err(LinkError::Closed)
        ));
    }

    #[test]
    fn test_injected_failures() {
        let (link, handle) = MockLink::new();
        let (mut rx, mut tx) = link.split().unwrap();

        handle.fail_sends(true);
        assert!(matches!(tx.send_line("HOME"), Err(LinkError::Io(_))));
        assert!(handle.sent_lines().is_empty());

        handle.fail_receives(true);
        assert!(matches!(
            rx.receive_line(Duration::from_millis(1)),
            Err(LinkError::Device(_))
        ));
    }
}

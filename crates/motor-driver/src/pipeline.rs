//! 接收线程主循环
//!
//! 阻塞读取控制器应答（带超时），把每一行交给会话处理。
//! 超时是正常情况；只有链路级错误才会触发断开流程。

use crate::metrics::LinkMetrics;
use crate::session::DeviceSession;
use motor_link::LineRx;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// 驱动配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// 接收轮询超时（毫秒）
    ///
    /// 决定 `disconnect()` 后接收线程最迟多久退出。
    pub poll_interval_ms: u64,
    /// 关闭时等待接收线程退出的最长时间（毫秒）
    pub join_timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            join_timeout_ms: 2000,
        }
    }
}

impl DriverConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

/// 接收线程主循环
///
/// 会话锁只在处理一行应答或链路丢失时持有，等待数据期间不持锁。
///
/// # 退出条件
///
/// - `is_running` 被置为 `false`
/// - 接收出错（链路已关闭或设备断开）；若会话仍在线，先执行断开流程
pub fn rx_loop(
    mut rx: impl LineRx,
    session: Arc<Mutex<DeviceSession>>,
    config: DriverConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<LinkMetrics>,
) {
    let poll_interval = config.poll_interval();

    loop {
        // Acquire: 看到 false 时，也能看到关闭线程之前的所有写入
        if !is_running.load(Ordering::Acquire) {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        match rx.receive_line(poll_interval) {
            Ok(Some(line)) => {
                metrics.lines_received.fetch_add(1, Ordering::Relaxed);
                session.lock().handle_line(&line);
            },
            Ok(None) => {
                metrics.idle_polls.fetch_add(1, Ordering::Relaxed);
            },
            Err(e) => {
                let mut session = session.lock();
                if is_running.load(Ordering::Acquire) && session.is_connected() {
                    if e.is_closed() {
                        warn!("RX thread: link closed by peer");
                    } else {
                        warn!("RX thread: receive failed: {e}");
                    }
                    session.handle_transport_loss(&e);
                } else {
                    debug!("RX thread: link closed ({e}), exiting");
                }
                is_running.store(false, Ordering::Release);
                break;
            },
        }
    }

    trace!("RX thread: loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{ChannelSink, DisconnectReason, HookManager, Notification};
    use motor_link::{MockLink, SplittableLink};
    use std::thread;
    use std::time::Instant;

    fn spawn_loop() -> (
        Arc<Mutex<DeviceSession>>,
        motor_link::MockLinkHandle,
        Arc<AtomicBool>,
        thread::JoinHandle<()>,
        crossbeam_channel::Receiver<Notification>,
    ) {
        let (link, handle) = MockLink::new();
        let (rx, tx) = link.split().unwrap();
        let metrics = Arc::new(LinkMetrics::new());
        let mut hooks = HookManager::new();
        let (sink, notifications) = ChannelSink::new();
        hooks.add_sink(Arc::new(sink));
        let session = Arc::new(Mutex::new(DeviceSession::new(
            Box::new(tx),
            hooks,
            metrics.clone(),
        )));
        let is_running = Arc::new(AtomicBool::new(true));

        let session_clone = session.clone();
        let running_clone = is_running.clone();
        let join = thread::spawn(move || {
            rx_loop(
                rx,
                session_clone,
                DriverConfig::default(),
                running_clone,
                metrics,
            )
        });
        (session, handle, is_running, join, notifications)
    }

    #[test]
    fn test_lines_reach_session() {
        let (session, handle, is_running, join, _notes) = spawn_loop();

        handle.push_line("WARNING_LIMIT_SWITCH_ACTIVE");
        let deadline = Instant::now() + Duration::from_secs(2);
        while !session.lock().limit_switch_active() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(session.lock().limit_switch_active());
        assert_eq!(session.lock().metrics().snapshot().lines_received, 1);

        is_running.store(false, Ordering::Release);
        join.join().unwrap();
    }

    #[test]
    fn test_receive_failure_disconnects() {
        let (session, handle, is_running, join, notes) = spawn_loop();

        handle.fail_receives(true);
        join.join().unwrap();

        assert!(!is_running.load(Ordering::Acquire));
        assert!(!session.lock().is_connected());
        assert_eq!(handle.sent_lines(), vec!["PARAR", "DESABILITAR"]);
        let closed = notes.try_iter().any(|n| {
            matches!(
                n,
                Notification::ConnectionClosed {
                    reason: DisconnectReason::TransportFailed(_)
                }
            )
        });
        assert!(closed);
    }

    #[test]
    fn test_operator_disconnect_stops_loop_quietly() {
        let (session, handle, _is_running, join, notes) = spawn_loop();

        session.lock().disconnect();
        join.join().unwrap();

        assert_eq!(handle.close_calls(), 1);
        let reasons: Vec<_> = notes
            .try_iter()
            .filter_map(|n| match n {
                Notification::ConnectionClosed { reason } => Some(reason),
                _ => None,
            })
            .collect();
        assert_eq!(reasons, vec![DisconnectReason::Requested]);
    }
}

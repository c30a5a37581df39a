//! 电机控制器：会话 + 接收线程
//!
//! [`MotorController`] 把 [`DeviceSession`] 放在一把 `parking_lot::Mutex` 里，
//! 操作员线程和接收线程共享这把锁。

use crate::error::SessionError;
use crate::hooks::{HookManager, NotificationSink};
use crate::metrics::{LinkMetrics, MetricsSnapshot};
use crate::pipeline::{DriverConfig, rx_loop};
use crate::session::DeviceSession;
use crate::state::SessionSnapshot;
use motor_link::{LinkError, SplittableLink};
use motor_protocol::Direction;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{error, info};

/// 带超时的 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 看门狗线程负责真正的 join；超时后它继续运行，进程退出时回收
        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(Box::new(
                std::io::Error::new(std::io::ErrorKind::TimedOut, "Thread join timeout"),
            )),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "Thread panicked during join",
                )))
            },
        }
    }
}

/// 电机控制器
///
/// 析构时自动执行优雅断开（`PARAR`、`DESABILITAR`、关闭链路）并等待接收线程退出。
pub struct MotorController {
    session: Arc<Mutex<DeviceSession>>,
    rx_thread: Option<JoinHandle<()>>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<LinkMetrics>,
    config: DriverConfig,
}

impl MotorController {
    /// 在任意可拆分链路上启动会话和接收线程
    pub fn start<L>(
        link: L,
        hooks: HookManager,
        config: DriverConfig,
    ) -> Result<Self, LinkError>
    where
        L: SplittableLink,
    {
        let (rx, tx) = link.split()?;
        let metrics = Arc::new(LinkMetrics::new());
        let session = Arc::new(Mutex::new(DeviceSession::new(
            Box::new(tx),
            hooks,
            metrics.clone(),
        )));
        let is_running = Arc::new(AtomicBool::new(true));

        let session_clone = session.clone();
        let running_clone = is_running.clone();
        let metrics_clone = metrics.clone();
        let rx_thread = std::thread::Builder::new()
            .name("motor-rx".into())
            .spawn(move || rx_loop(rx, session_clone, config, running_clone, metrics_clone))?;

        info!("Motor controller started");
        Ok(Self {
            session,
            rx_thread: Some(rx_thread),
            is_running,
            metrics,
            config,
        })
    }

    /// 直接访问会话锁（组合多个操作时使用）
    pub fn session(&self) -> &Arc<Mutex<DeviceSession>> {
        &self.session
    }

    /// 注册额外的通知接收端
    pub fn add_sink(&self, sink: Arc<dyn NotificationSink>) {
        self.session.lock().hooks_mut().add_sink(sink);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().snapshot()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.session.lock().is_connected()
    }

    /// 接收线程是否仍在运行
    pub fn is_healthy(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
            && self.rx_thread.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn toggle_motor_power(&self) -> Result<bool, SessionError> {
        self.session.lock().toggle_motor_power()
    }

    pub fn stop(&self) -> Result<(), SessionError> {
        self.session.lock().stop()
    }

    pub fn set_direction(&self, direction: Direction) -> Result<(), SessionError> {
        self.session.lock().set_direction(direction)
    }

    pub fn move_by_angle(&self, degrees: f64, frequency_hz: u32) -> Result<(), SessionError> {
        self.session.lock().move_by_angle(degrees, frequency_hz)
    }

    pub fn go_home(&self) -> Result<(), SessionError> {
        self.session.lock().go_home()
    }

    pub fn reset_calibration(&self) -> Result<(), SessionError> {
        self.session.lock().reset_calibration()
    }

    pub fn start_calibration(&self) -> Result<(), SessionError> {
        self.session.lock().start_calibration()
    }

    pub fn calibration_move(&self, theoretical: f64) -> Result<(), SessionError> {
        self.session.lock().calibration_move(theoretical)
    }

    pub fn record_measurement(&self, measured: f64) -> Result<(), SessionError> {
        self.session.lock().record_measurement(measured)
    }

    pub fn submit_calibration(&self) -> Result<(), SessionError> {
        self.session.lock().submit_calibration()
    }

    pub fn disable_calibration(&self) {
        self.session.lock().disable_calibration()
    }

    /// 优雅断开并等待接收线程退出（幂等）
    pub fn disconnect(&mut self) {
        self.session.lock().disconnect();
        self.is_running.store(false, Ordering::Release);

        let join_timeout = self.config.join_timeout();
        if let Some(handle) = self.rx_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "RX thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }
    }
}

impl Drop for MotorController {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for MotorController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotorController")
            .field("session", &*self.session.lock())
            .field("is_running", &self.is_running.load(Ordering::Relaxed))
            .field("config", &self.config)
            .finish()
    }
}

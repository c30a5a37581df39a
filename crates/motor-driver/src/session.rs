//! 设备会话状态机
//!
//! [`DeviceSession`] 持有一条连接的全部状态：电机使能、限位开关、回零状态、
//! 角度控制可用性和校准序列。两条路径会修改它：
//!
//! - **操作员路径**: `toggle_motor_power`、`move_by_angle` 等，同步返回 `Result`
//! - **接收路径**: [`DeviceSession::handle_line`] 处理控制器应答
//!
//! 两条路径都必须持有同一把会话锁（见 [`crate::MotorController`]），保证一条应答
//! 和一个操作员动作不会交错执行半个状态转换。
//!
//! 每次状态变化都通过 [`HookManager`] 发出 [`Notification`]；状态未变化时不发通知。

use crate::calibration::CalibrationSequence;
use crate::error::{NotReadyReason, SessionError};
use crate::hooks::{CalibrationResult, DisconnectReason, HookManager, Notification};
use crate::metrics::LinkMetrics;
use crate::state::{HomingState, SessionSnapshot};
use motor_link::{LineTx, LinkError};
use motor_protocol::{AckEvent, Command, Direction, classify};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, info, trace, warn};

/// 设备会话
pub struct DeviceSession {
    /// `None` 表示已断开（Disconnected），此后所有指令都以 `NotConnected` 拒绝
    link: Option<Box<dyn LineTx>>,
    motor_enabled: bool,
    limit_switch_active: bool,
    motion_in_progress: bool,
    homing: HomingState,
    angle_controls_enabled: bool,
    calibration: CalibrationSequence,
    hooks: HookManager,
    metrics: Arc<LinkMetrics>,
}

impl DeviceSession {
    /// 在已打开的链路上创建新会话（回零状态为 `NotHomed`）
    pub fn new(link: Box<dyn LineTx>, hooks: HookManager, metrics: Arc<LinkMetrics>) -> Self {
        Self {
            link: Some(link),
            motor_enabled: false,
            limit_switch_active: false,
            motion_in_progress: false,
            homing: HomingState::NotHomed,
            angle_controls_enabled: false,
            calibration: CalibrationSequence::new(),
            hooks,
            metrics,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn motor_enabled(&self) -> bool {
        self.motor_enabled
    }

    pub fn limit_switch_active(&self) -> bool {
        self.limit_switch_active
    }

    /// 已发出移动指令，尚未收到运动结束、限位或错误应答
    pub fn motion_in_progress(&self) -> bool {
        self.motion_in_progress
    }

    pub fn homing_state(&self) -> HomingState {
        self.homing
    }

    pub fn angle_controls_enabled(&self) -> bool {
        self.angle_controls_enabled
    }

    pub fn calibration(&self) -> &CalibrationSequence {
        &self.calibration
    }

    pub fn hooks_mut(&mut self) -> &mut HookManager {
        &mut self.hooks
    }

    pub fn metrics(&self) -> &Arc<LinkMetrics> {
        &self.metrics
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connected: self.is_connected(),
            motor_enabled: self.motor_enabled,
            limit_switch_active: self.limit_switch_active,
            motion_in_progress: self.motion_in_progress,
            homing: self.homing,
            angle_controls_enabled: self.angle_controls_enabled,
            calibration_phase: self.calibration.phase(),
            calibration_step: self.calibration.step(),
            calibration_points: self.calibration.points().to_vec(),
        }
    }

    // ==================== 操作员动作 ====================

    /// 切换电机使能（乐观更新：先改状态再发送），返回新的使能状态
    pub fn toggle_motor_power(&mut self) -> Result<bool, SessionError> {
        self.require_connected()?;
        let enabled = !self.motor_enabled;
        self.set_motor_enabled(enabled);
        self.rederive_angle_controls();
        let command = if enabled { Command::Enable } else { Command::Disable };
        self.send(&command)?;
        Ok(enabled)
    }

    /// 停止电机（任何状态下都允许，只要链路在线）
    pub fn stop(&mut self) -> Result<(), SessionError> {
        self.require_connected()?;
        self.send(&Command::Stop)
    }

    pub fn set_direction(&mut self, direction: Direction) -> Result<(), SessionError> {
        self.require_connected()?;
        self.require_angle_controls()?;
        self.send(&Command::SetDirection(direction))
    }

    /// 按角度移动
    ///
    /// 先校验参数：非法角度或频率总是返回 `Validation`，不产生任何串口流量。
    pub fn move_by_angle(&mut self, degrees: f64, frequency_hz: u32) -> Result<(), SessionError> {
        let command = Command::move_angle(degrees, frequency_hz)?;
        self.require_connected()?;
        self.require_angle_controls()?;
        self.send(&command)?;
        self.motion_in_progress = true;
        Ok(())
    }

    /// 回零（需要电机使能且没有进行中的校准）
    pub fn go_home(&mut self) -> Result<(), SessionError> {
        self.require_connected()?;
        if !self.motor_enabled {
            return Err(NotReadyReason::MotorNotEnabled.into());
        }
        if self.homing == HomingState::InProgress {
            return Err(NotReadyReason::HomingInProgress.into());
        }
        if self.calibration.is_active() {
            return Err(NotReadyReason::CalibrationActive.into());
        }
        self.send(&Command::Home)
    }

    /// 请求控制器把校准因子恢复为默认值
    ///
    /// 本地状态等到 `ACK_CALIBRATION_RESET` 才更新。
    pub fn reset_calibration(&mut self) -> Result<(), SessionError> {
        self.require_connected()?;
        self.send(&Command::ResetCalibration)
    }

    pub fn start_calibration(&mut self) -> Result<(), SessionError> {
        self.require_connected()?;
        if !self.motor_enabled {
            return Err(NotReadyReason::MotorNotEnabled.into());
        }
        self.calibration.start()?;
        info!("Calibration started");
        self.emit_calibration_phase();
        self.rederive_angle_controls();
        Ok(())
    }

    /// 移动到当前校准步的理论角度（固定 50 Hz，需要电机使能）
    pub fn calibration_move(&mut self, theoretical: f64) -> Result<(), SessionError> {
        self.require_connected()?;
        if !self.motor_enabled {
            return Err(NotReadyReason::MotorNotEnabled.into());
        }
        let command = self.calibration.plan_move(theoretical)?;
        self.send(&command)?;
        self.motion_in_progress = true;
        self.calibration.confirm_move(theoretical);
        self.emit_calibration_phase();
        Ok(())
    }

    /// 记录当前步的实测角度（纯本地操作）
    pub fn record_measurement(&mut self, measured: f64) -> Result<(), SessionError> {
        self.require_connected()?;
        self.calibration.record(measured)?;
        if let Some(point) = self.calibration.points().last() {
            info!(
                step = self.calibration.step(),
                "Calibration point recorded: {point}"
            );
        }
        self.emit_calibration_phase();
        Ok(())
    }

    /// 发送三个校准点
    pub fn submit_calibration(&mut self) -> Result<(), SessionError> {
        self.require_connected()?;
        let command = self.calibration.plan_submit()?;
        self.send(&command)?;
        self.calibration.confirm_submit();
        self.emit_calibration_phase();
        Ok(())
    }

    /// 放弃校准，回到 `Idle`（幂等，断开后也可调用）
    pub fn disable_calibration(&mut self) {
        if self.calibration.reset() {
            info!("Calibration disabled by operator");
            self.emit_calibration_phase();
            self.rederive_angle_controls();
        }
    }

    /// 主动断开：尽力发送 `PARAR`/`DESABILITAR`，然后关闭链路（幂等）
    pub fn disconnect(&mut self) {
        self.shutdown(DisconnectReason::Requested);
    }

    // ==================== 接收路径 ====================

    /// 处理一行控制器应答，返回其分类结果
    pub fn handle_line(&mut self, line: &str) -> AckEvent {
        let event = classify(line);
        if !self.is_connected() {
            debug!("Ignoring line received after disconnect: {line}");
            return event;
        }
        debug!(event = %event, "<- {line}");

        match event {
            AckEvent::LimitSwitchTripped => {
                warn!("Limit switch tripped");
                self.motion_in_progress = false;
                self.set_limit_switch(true);
            },
            AckEvent::LimitSwitchCleared => self.set_limit_switch(false),
            AckEvent::MotionSettled => {
                self.motion_in_progress = false;
                self.set_limit_switch(false);
                if self.calibration.on_motion_settled() {
                    self.emit_calibration_phase();
                }
            },
            AckEvent::HomingStarted => self.set_homing(HomingState::InProgress),
            AckEvent::HomingCompleted => self.set_homing(HomingState::Homed),
            AckEvent::HomingUnknown => self.set_homing(HomingState::NotHomed),
            AckEvent::GenericError => {
                warn!("Controller reported error: {line}");
                self.motion_in_progress = false;
                self.set_limit_switch(false);
                if self.homing == HomingState::InProgress {
                    self.set_homing(HomingState::Error);
                }
                self.fail_calibration(line);
            },
            AckEvent::CalibrationPointAck => {
                debug!("Calibration point acknowledged by controller");
            },
            AckEvent::CalibrationSucceeded => {
                if self.calibration.complete() {
                    info!("Calibration completed");
                    self.emit_calibration_phase();
                    self.emit(Notification::CalibrationOutcome {
                        result: CalibrationResult::Success,
                        detail: "calibration factor applied".to_string(),
                    });
                } else {
                    debug!(
                        phase = %self.calibration.phase(),
                        "Calibration completion received outside of a submission"
                    );
                }
            },
            AckEvent::CalibrationFailedZeroFactor => {
                if self.fail_calibration(line) {
                    warn!("Calibration failed: zero factor");
                } else {
                    debug!(
                        phase = %self.calibration.phase(),
                        "Zero factor reported outside of a submission"
                    );
                }
            },
            AckEvent::CalibrationReset => {
                info!("Controller calibration reset to defaults");
                if self.calibration.reset() {
                    self.emit_calibration_phase();
                }
            },
            AckEvent::Unknown => {
                self.metrics.unrecognized_lines.fetch_add(1, Ordering::Relaxed);
                warn!("Unrecognized line from controller: {line}");
            },
        }

        if event.is_device_error() {
            self.emit(Notification::DeviceReportedError {
                line: line.to_string(),
            });
        }
        self.rederive_angle_controls();
        event
    }

    /// 链路收发失败：执行尽力断开流程（幂等）
    pub fn handle_transport_loss(&mut self, error: &LinkError) {
        if !self.is_connected() {
            return;
        }
        warn!("Transport lost: {error}");
        self.shutdown(DisconnectReason::TransportFailed(error.to_string()));
    }

    // ==================== 内部实现 ====================

    fn send(&mut self, command: &Command) -> Result<(), SessionError> {
        let line = command.to_line();
        let Some(link) = self.link.as_mut() else {
            return Err(NotReadyReason::NotConnected.into());
        };

        match link.send_line(&line) {
            Ok(()) => {
                self.metrics.commands_sent.fetch_add(1, Ordering::Relaxed);
                debug!(command = command.name(), "-> {line}");
                Ok(())
            },
            Err(e) => {
                self.metrics.send_failures.fetch_add(1, Ordering::Relaxed);
                warn!(command = command.name(), "Failed to send '{line}': {e}");
                self.shutdown(DisconnectReason::TransportFailed(e.to_string()));
                Err(e.into())
            },
        }
    }

    fn shutdown(&mut self, reason: DisconnectReason) {
        let Some(mut link) = self.link.take() else {
            return;
        };

        for command in [Command::Stop, Command::Disable] {
            match link.send_line(&command.to_line()) {
                Ok(()) => {
                    self.metrics.commands_sent.fetch_add(1, Ordering::Relaxed);
                },
                Err(e) => debug!("Best-effort {} failed during shutdown: {e}", command.name()),
            }
        }
        link.close();

        self.motion_in_progress = false;
        self.set_motor_enabled(false);
        if self.calibration.reset() {
            self.emit_calibration_phase();
        }
        self.rederive_angle_controls();

        info!("Disconnected ({reason})");
        self.emit(Notification::ConnectionClosed { reason });
    }

    fn fail_calibration(&mut self, line: &str) -> bool {
        if !self.calibration.fail() {
            return false;
        }
        self.emit_calibration_phase();
        self.emit(Notification::CalibrationOutcome {
            result: CalibrationResult::Failure,
            detail: line.to_string(),
        });
        true
    }

    fn require_connected(&self) -> Result<(), SessionError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(NotReadyReason::NotConnected.into())
        }
    }

    fn require_angle_controls(&self) -> Result<(), SessionError> {
        if !self.motor_enabled {
            return Err(NotReadyReason::MotorNotEnabled.into());
        }
        if self.homing == HomingState::InProgress {
            return Err(NotReadyReason::HomingInProgress.into());
        }
        if self.calibration.is_active() {
            return Err(NotReadyReason::CalibrationActive.into());
        }
        Ok(())
    }

    fn set_motor_enabled(&mut self, enabled: bool) {
        if self.motor_enabled != enabled {
            self.motor_enabled = enabled;
            self.emit(Notification::PowerStateChanged { enabled });
        }
    }

    fn set_limit_switch(&mut self, active: bool) {
        if self.limit_switch_active != active {
            self.limit_switch_active = active;
            self.emit(Notification::LimitSwitchChanged { active });
        }
    }

    fn set_homing(&mut self, state: HomingState) {
        if self.homing != state {
            self.homing = state;
            self.emit(Notification::HomingStateChanged(state));
        }
    }

    /// 角度控制 = 电机使能 且 未在回零 且 无进行中的校准
    fn rederive_angle_controls(&mut self) {
        let enabled = self.motor_enabled
            && self.homing != HomingState::InProgress
            && !self.calibration.is_active();
        if self.angle_controls_enabled != enabled {
            self.angle_controls_enabled = enabled;
            self.emit(Notification::AngleControlsAvailabilityChanged { enabled });
        }
    }

    fn emit_calibration_phase(&self) {
        self.emit(Notification::CalibrationPhaseChanged {
            phase: self.calibration.phase(),
            step: self.calibration.step(),
        });
    }

    fn emit(&self, notification: Notification) {
        trace!(?notification, "notify");
        self.hooks.trigger_all(&notification);
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("connected", &self.is_connected())
            .field("motor_enabled", &self.motor_enabled)
            .field("limit_switch_active", &self.limit_switch_active)
            .field("motion_in_progress", &self.motion_in_progress)
            .field("homing", &self.homing)
            .field("angle_controls_enabled", &self.angle_controls_enabled)
            .field("calibration", &self.calibration.phase())
            .finish()
    }
}

//! 三点角度校准序列
//!
//! ```text
//! Idle ──start──▶ AwaitingMove(k) ──move──▶ AwaitingMeasurement(k)
//!                      ▲                          │ MotionSettled
//!                      │ record (k+1 < 3)         ▼
//!                      └──────────────────── ReadyToRecord(k)
//!                                                 │ record (k+1 == 3)
//!                                                 ▼
//!          Completed ◀──ack── Submitted ◀──submit── ReadyToSubmit
//!          Failed    ◀──nack──┘
//! ```
//!
//! 序列只维护状态，不做 I/O。需要发送的指令以 [`Command`] 形式返回给会话，
//! 由会话负责发送。不变量：`step() == points().len()`。

use crate::error::{NotReadyReason, SessionError};
use motor_protocol::{CALIBRATION_FREQUENCY_HZ, CALIBRATION_POINT_COUNT, CalibrationPoint, Command};
use std::fmt;

/// 校准阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CalibrationPhase {
    #[default]
    Idle,
    /// 等待操作员发起到理论角度的移动
    AwaitingMove,
    /// 已发送移动指令，等待控制器报告运动结束
    AwaitingMeasurement,
    /// 运动结束，等待操作员输入实测角度
    ReadyToRecord,
    /// 三个点已采集，等待提交
    ReadyToSubmit,
    /// 已发送 `CALIBRAR`，等待控制器计算结果
    Submitted,
    Completed,
    Failed,
}

impl CalibrationPhase {
    /// 校准是否正在进行（会锁定角度控制）
    pub const fn is_active(self) -> bool {
        !matches!(
            self,
            CalibrationPhase::Idle | CalibrationPhase::Completed | CalibrationPhase::Failed
        )
    }
}

impl fmt::Display for CalibrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CalibrationPhase::Idle => "idle",
            CalibrationPhase::AwaitingMove => "awaiting move",
            CalibrationPhase::AwaitingMeasurement => "awaiting measurement",
            CalibrationPhase::ReadyToRecord => "ready to record",
            CalibrationPhase::ReadyToSubmit => "ready to submit",
            CalibrationPhase::Submitted => "submitted",
            CalibrationPhase::Completed => "completed",
            CalibrationPhase::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// 每一步建议的理论角度（90°、180°、270°）
pub fn suggested_theoretical(step: usize) -> Option<f64> {
    const SUGGESTED: [f64; CALIBRATION_POINT_COUNT] = [90.0, 180.0, 270.0];
    SUGGESTED.get(step).copied()
}

/// 校准序列
#[derive(Debug, Clone, Default)]
pub struct CalibrationSequence {
    phase: CalibrationPhase,
    points: Vec<CalibrationPoint>,
    /// 当前步已发送移动指令的理论角度
    pending_theoretical: Option<f64>,
}

impl CalibrationSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// 已采集点数，同时也是下一个待采集点的下标
    pub fn step(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    /// 开始新的校准（电机使能由会话检查）
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.is_active() {
            return Err(NotReadyReason::CalibrationActive.into());
        }
        self.clear();
        self.phase = CalibrationPhase::AwaitingMove;
        Ok(())
    }

    /// 生成移动到理论角度的指令
    ///
    /// 只在 `AwaitingMove` 下有效；角度非法时状态不变。调用方发送成功后
    /// 必须调用 [`CalibrationSequence::confirm_move`]。
    pub fn plan_move(&self, theoretical: f64) -> Result<Command, SessionError> {
        self.expect_phase(CalibrationPhase::AwaitingMove)?;
        Ok(Command::move_angle(theoretical, CALIBRATION_FREQUENCY_HZ)?)
    }

    /// 移动指令已发出
    pub fn confirm_move(&mut self, theoretical: f64) {
        self.pending_theoretical = Some(theoretical);
        self.phase = CalibrationPhase::AwaitingMeasurement;
    }

    /// 控制器报告运动结束，返回阶段是否变化
    pub fn on_motion_settled(&mut self) -> bool {
        if self.phase == CalibrationPhase::AwaitingMeasurement {
            self.phase = CalibrationPhase::ReadyToRecord;
            true
        } else {
            false
        }
    }

    /// 记录当前步的实测角度
    ///
    /// 实测值非法时返回 `Validation`，保持 `ReadyToRecord`。
    pub fn record(&mut self, measured: f64) -> Result<(), SessionError> {
        if self.phase == CalibrationPhase::ReadyToSubmit {
            return Err(NotReadyReason::AllPointsCollected.into());
        }
        self.expect_phase(CalibrationPhase::ReadyToRecord)?;
        let Some(theoretical) = self.pending_theoretical else {
            return Err(NotReadyReason::WrongCalibrationPhase {
                expected: CalibrationPhase::AwaitingMove,
                actual: self.phase,
            }
            .into());
        };

        let point = CalibrationPoint::new(theoretical, measured)?;
        self.points.push(point);
        self.pending_theoretical = None;
        self.phase = if self.points.len() == CALIBRATION_POINT_COUNT {
            CalibrationPhase::ReadyToSubmit
        } else {
            CalibrationPhase::AwaitingMove
        };
        Ok(())
    }

    /// 生成提交指令（需要恰好三个点）
    pub fn plan_submit(&self) -> Result<Command, SessionError> {
        if !self.is_active() {
            return Err(NotReadyReason::CalibrationNotActive.into());
        }
        if self.phase == CalibrationPhase::Submitted {
            return Err(NotReadyReason::WrongCalibrationPhase {
                expected: CalibrationPhase::ReadyToSubmit,
                actual: self.phase,
            }
            .into());
        }
        let points: [CalibrationPoint; CALIBRATION_POINT_COUNT] = self
            .points
            .as_slice()
            .try_into()
            .map_err(|_| NotReadyReason::InsufficientPoints {
                collected: self.points.len(),
            })?;
        Ok(Command::calibrate(points))
    }

    /// 提交指令已发出
    pub fn confirm_submit(&mut self) {
        self.phase = CalibrationPhase::Submitted;
    }

    /// 控制器确认校准完成，返回是否生效
    pub fn complete(&mut self) -> bool {
        if self.phase != CalibrationPhase::Submitted {
            return false;
        }
        self.clear();
        self.phase = CalibrationPhase::Completed;
        true
    }

    /// 控制器拒绝已提交的校准点，返回是否生效
    ///
    /// 只在 `Submitted` 下生效，其他阶段的拒绝不影响已采集的点。
    pub fn fail(&mut self) -> bool {
        if self.phase != CalibrationPhase::Submitted {
            return false;
        }
        self.clear();
        self.phase = CalibrationPhase::Failed;
        true
    }

    /// 回到 `Idle` 并清空数据，返回是否有变化
    pub fn reset(&mut self) -> bool {
        let changed = self.phase != CalibrationPhase::Idle || !self.points.is_empty();
        self.clear();
        self.phase = CalibrationPhase::Idle;
        changed
    }

    fn clear(&mut self) {
        self.points.clear();
        self.pending_theoretical = None;
    }

    fn expect_phase(&self, expected: CalibrationPhase) -> Result<(), SessionError> {
        if !self.is_active() {
            return Err(NotReadyReason::CalibrationNotActive.into());
        }
        if self.phase != expected {
            return Err(NotReadyReason::WrongCalibrationPhase {
                expected,
                actual: self.phase,
            }
            .into());
        }
        Ok(())
    }
}

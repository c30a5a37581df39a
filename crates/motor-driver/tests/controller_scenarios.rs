//! 控制器端到端场景测试
//!
//! 通过 Mock 链路驱动完整的 `MotorController`（会话 + 接收线程）：
//! 1. 三点校准成功流程
//! 2. 零因子校准失败
//! 3. 运动中链路丢失
//! 4. 析构时优雅断开

use crossbeam_channel::Receiver;
use motor_driver::{
    CalibrationPhase, CalibrationResult, ChannelSink, DisconnectReason, HomingState, MotorBuilder,
    MotorController, NotReadyReason, Notification, SessionError,
};
use motor_link::{MockLink, MockLinkHandle};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(2);

fn start() -> (MotorController, MockLinkHandle, Receiver<Notification>) {
    let (link, handle) = MockLink::new();
    let (sink, notifications) = ChannelSink::new();
    let controller = MotorBuilder::new()
        .poll_interval_ms(5)
        .sink(Arc::new(sink))
        .build_with_link(link)
        .unwrap();
    (controller, handle, notifications)
}

/// 等待某个条件成立（接收线程异步处理应答）
fn wait_until(controller: &MotorController, pred: impl Fn(&MotorController) -> bool) {
    let deadline = Instant::now() + WAIT;
    while !pred(controller) {
        assert!(Instant::now() < deadline, "condition not reached in {WAIT:?}");
        thread::sleep(Duration::from_millis(2));
    }
}

fn wait_for_phase(controller: &MotorController, phase: CalibrationPhase) {
    wait_until(controller, |c| c.snapshot().calibration_phase == phase);
}

fn collect_point(
    controller: &MotorController,
    handle: &MockLinkHandle,
    theoretical: f64,
    measured: f64,
) {
    controller.calibration_move(theoretical).unwrap();
    handle.push_line("ACK_ANGULO_CONCLUIDO");
    wait_for_phase(controller, CalibrationPhase::ReadyToRecord);
    controller.record_measurement(measured).unwrap();
}

#[test]
fn test_three_point_calibration_succeeds() {
    let (controller, handle, notifications) = start();

    controller.toggle_motor_power().unwrap();
    controller.start_calibration().unwrap();

    collect_point(&controller, &handle, 90.0, 88.5);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.calibration_step, 1);
    assert_eq!(snapshot.calibration_phase, CalibrationPhase::AwaitingMove);

    collect_point(&controller, &handle, 180.0, 179.0);
    collect_point(&controller, &handle, 270.0, 271.2);
    assert_eq!(
        controller.snapshot().calibration_phase,
        CalibrationPhase::ReadyToSubmit
    );
    assert!(!controller.snapshot().angle_controls_enabled);

    controller.submit_calibration().unwrap();
    assert_eq!(
        handle.last_sent().as_deref(),
        Some("CALIBRAR 90.0,88.5;180.0,179.0;270.0,271.2")
    );

    handle.push_line("ACK_CALIBRATION_COMPLETE");
    wait_for_phase(&controller, CalibrationPhase::Completed);
    assert!(controller.snapshot().angle_controls_enabled);

    let outcomes: Vec<_> = notifications
        .try_iter()
        .filter_map(|n| match n {
            Notification::CalibrationOutcome { result, .. } => Some(result),
            _ => None,
        })
        .collect();
    assert_eq!(outcomes, vec![CalibrationResult::Success]);
}

#[test]
fn test_zero_factor_fails_calibration() {
    let (controller, handle, notifications) = start();

    controller.toggle_motor_power().unwrap();
    handle.push_line("ACK_HOMING_CONCLUIDO");
    wait_until(&controller, |c| c.snapshot().homing == HomingState::Homed);

    controller.start_calibration().unwrap();
    collect_point(&controller, &handle, 90.0, 90.0);
    collect_point(&controller, &handle, 180.0, 180.0);
    collect_point(&controller, &handle, 270.0, 270.0);
    controller.submit_calibration().unwrap();

    handle.push_line("NACK_CALIBRATION_FACTOR_ZERO");
    wait_for_phase(&controller, CalibrationPhase::Failed);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.homing, HomingState::Homed);
    assert!(snapshot.angle_controls_enabled);
    assert!(snapshot.connected);

    let failed = notifications.try_iter().any(|n| {
        matches!(
            n,
            Notification::CalibrationOutcome {
                result: CalibrationResult::Failure,
                ..
            }
        )
    });
    assert!(failed);
}

#[test]
fn test_transport_loss_during_move() {
    let (controller, handle, notifications) = start();

    controller.toggle_motor_power().unwrap();
    controller.move_by_angle(180.0, 100).unwrap();
    handle.clear_sent();

    handle.fail_receives(true);
    wait_until(&controller, |c| !c.is_connected());

    assert_eq!(handle.sent_lines(), vec!["PARAR", "DESABILITAR"]);
    assert!(!controller.snapshot().motor_enabled);
    wait_until(&controller, |c| !c.is_healthy());

    let err = controller.move_by_angle(90.0, 50).unwrap_err();
    assert_eq!(
        err.not_ready_reason(),
        Some(&NotReadyReason::NotConnected)
    );
    // 非法输入仍然先报告 Validation
    assert!(matches!(
        controller.move_by_angle(400.0, 50),
        Err(SessionError::Validation(_))
    ));

    let closed = notifications.try_iter().any(|n| {
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
fn test_drop_disconnects_gracefully() {
    let (controller, handle, _notifications) = start();
    controller.toggle_motor_power().unwrap();
    handle.clear_sent();

    let started = Instant::now();
    drop(controller);

    assert!(started.elapsed() < WAIT);
    assert_eq!(handle.sent_lines(), vec!["PARAR", "DESABILITAR"]);
    assert!(handle.is_closed());
}

#[test]
fn test_disconnect_is_idempotent() {
    let (mut controller, handle, _notifications) = start();

    controller.disconnect();
    controller.disconnect();
    assert_eq!(handle.close_calls(), 1);
    assert!(!controller.is_healthy());
}

#[test]
fn test_limit_switch_tracking_through_rx_thread() {
    let (controller, handle, _notifications) = start();

    handle.push_line("WARNING_LIMIT_SWITCH_HIT");
    wait_until(&controller, |c| c.snapshot().limit_switch_active);

    handle.push_line("garbage line");
    handle.push_line("ACK_LIMIT_SWITCH_RESET");
    wait_until(&controller, |c| !c.snapshot().limit_switch_active);

    let metrics = controller.metrics();
    assert_eq!(metrics.lines_received, 3);
    assert_eq!(metrics.unrecognized_lines, 1);
}

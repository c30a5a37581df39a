//! 会话状态机属性测试

use motor_driver::{CalibrationPhase, DeviceSession, HookManager, LinkMetrics};
use motor_link::{MockLink, MockLinkHandle, SplittableLink};
use proptest::prelude::*;
use std::sync::Arc;

fn session() -> (DeviceSession, MockLinkHandle) {
    let (link, handle) = MockLink::new();
    let (_rx, tx) = link.split().unwrap();
    let session = DeviceSession::new(
        Box::new(tx),
        HookManager::new(),
        Arc::new(LinkMetrics::new()),
    );
    (session, handle)
}

/// 按固定顺序推进校准：移动、运动结束、记录、提交
fn advance_calibration(session: &mut DeviceSession, action: usize) {
    match action % 4 {
        0 => {
            let _ = session.calibration_move(90.0);
        },
        1 => {
            session.handle_line("ACK_PARADO");
        },
        2 => {
            let _ = session.record_measurement(91.0);
        },
        _ => {
            let _ = session.submit_calibration();
        },
    }
}

const LINES: &[&str] = &[
    "WARNING_LIMIT_SWITCH_ACTIVE",
    "WARNING_LIMIT_SWITCH_HIT",
    "ACK_LIMIT_SWITCH_RESET",
    "ACK_PARADO",
    "ACK_ANGULO_CONCLUIDO",
    "ACK_HOMING_STARTED",
    "ACK_HOMING_CONCLUIDO",
    "ACK_NOT_HOMED",
    "NACK_SOMETHING",
    "ACK_CALIBRATION_POINT_1",
    "ACK_CALIBRATION_COMPLETE",
    "NACK_CALIBRATION_FACTOR_ZERO",
    "ACK_CALIBRATION_RESET",
    "noise",
];

proptest! {
    /// 限位开关状态只取决于最近一次相关事件
    #[test]
    fn limit_switch_follows_last_relevant_event(
        indices in prop::collection::vec(0..LINES.len(), 0..40)
    ) {
        let (mut session, _handle) = session();
        let mut expected = false;
        for i in indices {
            let line = LINES[i];
            match line {
                "WARNING_LIMIT_SWITCH_ACTIVE" | "WARNING_LIMIT_SWITCH_HIT" => expected = true,
                "ACK_LIMIT_SWITCH_RESET" | "ACK_PARADO" | "ACK_ANGULO_CONCLUIDO" | "NACK_SOMETHING" => {
                    expected = false
                },
                _ => {},
            }
            session.handle_line(line);
            prop_assert_eq!(session.limit_switch_active(), expected);
        }
    }

    /// 角度控制始终等于派生规则，校准点数始终等于步数
    #[test]
    fn derived_state_invariants_hold(
        indices in prop::collection::vec(0..LINES.len(), 0..40),
        enable_motor in any::<bool>(),
        start_calibration in any::<bool>(),
    ) {
        let (mut session, _handle) = session();
        if enable_motor {
            session.toggle_motor_power().unwrap();
        }
        if start_calibration {
            let _ = session.start_calibration();
            let _ = session.calibration_move(90.0);
        }
        for i in indices {
            session.handle_line(LINES[i]);
            let calibration = session.calibration();
            prop_assert_eq!(calibration.step(), calibration.points().len());
            let expected = session.motor_enabled()
                && session.homing_state() != motor_driver::HomingState::InProgress
                && !calibration.is_active();
            prop_assert_eq!(session.angle_controls_enabled(), expected);
        }
    }

    /// 超出范围的角度总是被拒绝，且不发送任何指令
    #[test]
    fn out_of_range_move_sends_nothing(
        degrees in prop_oneof![-1.0e6f64..-1.0e-3, 360.001f64..1.0e6],
        frequency in 1u32..=200,
        enable_motor in any::<bool>(),
    ) {
        let (mut session, handle) = session();
        if enable_motor {
            session.toggle_motor_power().unwrap();
        }
        handle.clear_sent();
        prop_assert!(session.move_by_angle(degrees, frequency).unwrap_err().is_validation());
        prop_assert!(handle.sent_lines().is_empty());
    }

    /// 从任何阶段放弃校准都回到 Idle，第二次放弃无变化
    #[test]
    fn disable_calibration_from_any_phase(steps in 0usize..8) {
        let (mut session, _handle) = session();
        session.toggle_motor_power().unwrap();
        session.start_calibration().unwrap();
        for i in 0..steps {
            advance_calibration(&mut session, i);
        }

        session.disable_calibration();
        prop_assert_eq!(session.calibration().phase(), CalibrationPhase::Idle);
        prop_assert!(session.calibration().points().is_empty());

        let before = session.snapshot();
        session.disable_calibration();
        prop_assert_eq!(session.snapshot(), before);
    }
}

//! Host tests for writing and sweeping servos through the shared bank.
#![allow(missing_docs, reason = "integration tests")]
#![allow(clippy::unwrap_used, reason = "integration tests")]

use servo_kit::mock::MockHardware;
use servo_kit::{
    ControlLine, Error, PULSE_REFRESH_INTERVAL_MS, Servo, ServoBankStatic, SweepConfig,
    SweepPolicy, TICK_INTERVAL_MS,
};

type Bank = ServoBankStatic<MockHardware, 4>;

fn bank() -> Bank {
    let servos = Bank::new_static();
    servos.init(MockHardware::new()).unwrap();
    servos
}

fn tick(servos: &Bank) {
    servos.with(|bank| bank.hardware_mut().advance_ms(TICK_INTERVAL_MS));
    servos.on_interrupt();
}

fn pulses(servos: &Bank, line: u8) -> Vec<u16> {
    servos
        .with(|bank| bank.hardware().pulse_widths(ControlLine::from(line)).to_vec())
        .unwrap()
}

/// Angles seen after each of `ticks` ticks.
fn angles(servos: &Bank, servo: &Servo<'_, MockHardware, 4>, ticks: usize) -> Vec<u8> {
    (0..ticks)
        .map(|_| {
            tick(servos);
            servo.read()
        })
        .collect()
}

#[test]
fn write_clamps_into_constraints() {
    let servos = bank();
    let servo = servos.servo().unwrap();
    assert!(servo.attach_constrained(9, 10, 170));

    servo.write(200);
    assert_eq!(servo.read(), 170);
    servo.write(-30);
    assert_eq!(servo.read(), 10);
}

#[test]
fn inverted_constraints_are_swapped() {
    let servos = bank();
    let servo = servos.servo().unwrap();
    assert!(servo.attach_constrained(9, 150, 30));

    servo.write(0);
    assert_eq!(servo.read(), 30);
    servo.write(180);
    assert_eq!(servo.read(), 150);
}

#[test]
fn invalid_attach_leaves_servo_detached() {
    let servos = bank();
    let servo = servos.servo().unwrap();

    assert_eq!(servo.try_attach(-1, 0, 180), Err(Error::InvalidLine(-1)));
    assert_eq!(
        servo.try_attach(9, 0, 200),
        Err(Error::ConstraintOutOfRange { low: 0, high: 200 })
    );
    assert!(!servo.is_attached());

    servo.write(90);
    servo.enable_callback();
    assert_eq!(servo.read(), 0);
    assert!(!servo.is_registered());
    assert!(pulses(&servos, 9).is_empty());
}

#[test]
fn attach_sends_the_zero_degree_pulse() {
    let servos = bank();
    let servo = servos.servo().unwrap();
    assert!(servo.attach(9));
    assert_eq!(pulses(&servos, 9), [500]);
}

#[test]
fn pulses_closer_than_the_refresh_interval_are_dropped() {
    let servos = bank();
    let servo = servos.servo().unwrap();
    assert!(servo.attach(9));

    servo.write(90);
    assert_eq!(servo.read(), 90);
    assert_eq!(pulses(&servos, 9), [500]);

    servos.with(|bank| bank.hardware_mut().advance_ms(PULSE_REFRESH_INTERVAL_MS));
    servo.refresh();
    assert_eq!(pulses(&servos, 9), [500, 1450]);
}

#[test]
fn write_microseconds_keeps_the_recorded_angle() {
    let servos = bank();
    let servo = servos.servo().unwrap();
    assert!(servo.attach(9));
    servos.with(|bank| bank.hardware_mut().advance_ms(PULSE_REFRESH_INTERVAL_MS));

    servo.write_microseconds(1234);
    assert_eq!(pulses(&servos, 9), [500, 1234]);
    assert_eq!(servo.read(), 0);
}

#[test]
fn single_sweep_lands_on_stop_and_ends() {
    let servos = bank();
    let servo = servos.servo().unwrap();
    assert!(servo.attach(9));
    servo.enable_sweep(SweepConfig::new(10, 0, 180, SweepPolicy::Single));
    assert!(servo.is_registered());

    let seen = angles(&servos, &servo, 25);
    assert_eq!(seen.first(), Some(&10));
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(servo.read(), 180);
    assert!(!servo.is_sweeping());
    // Still refreshed after the sweep ends.
    assert!(servo.is_registered());
}

#[test]
fn reverse_sweep_oscillates_within_bounds() {
    let servos = bank();
    let servo = servos.servo().unwrap();
    assert!(servo.attach(9));
    servo.enable_sweep(SweepConfig::new(7, 0, 180, SweepPolicy::Reverse));

    let seen = angles(&servos, &servo, 80);
    assert!(seen.iter().all(|&angle| angle <= 180));
    assert!(seen.contains(&180));
    assert!(seen.windows(2).any(|pair| pair[0] < pair[1]));
    assert!(seen.windows(2).any(|pair| pair[0] > pair[1]));
    assert!(servo.is_sweeping());
}

#[test]
fn skip_reverse_sweep_restarts_from_start() {
    let servos = bank();
    let servo = servos.servo().unwrap();
    assert!(servo.attach(9));
    servo.enable_sweep(SweepConfig::new(10, 0, 180, SweepPolicy::SkipReverse));

    let seen = angles(&servos, &servo, 21);
    assert_eq!(&seen[16..], &[170, 180, 0, 10, 20]);
}

#[test]
fn sweep_is_confined_to_constraints() {
    let servos = bank();
    let servo = servos.servo().unwrap();
    assert!(servo.attach_constrained(9, 40, 120));
    servo.enable_sweep(SweepConfig::new(15, 0, 180, SweepPolicy::Reverse));
    assert_eq!(servo.read(), 40);

    let seen = angles(&servos, &servo, 30);
    assert!(seen.iter().all(|angle| (40..=120).contains(angle)));
}

#[test]
fn disable_sweep_holds_position_and_keeps_refreshing() {
    let servos = bank();
    let servo = servos.servo().unwrap();
    assert!(servo.attach(9));
    servo.enable_sweep(SweepConfig::default());
    angles(&servos, &servo, 3);

    servo.disable_sweep();
    let held = servo.read();
    servos.with(|bank| bank.hardware_mut().clear_events());

    assert_eq!(angles(&servos, &servo, 3), [held, held, held]);
    assert_eq!(pulses(&servos, 9).len(), 3);
}

#[test]
fn manual_sweep_step_without_callback() {
    let servos = bank();
    let servo = servos.servo().unwrap();
    assert!(servo.attach(9));
    servo.enable_sweep(SweepConfig::new(10, 0, 180, SweepPolicy::Reverse));
    servo.disable_callback();
    assert!(servo.is_sweeping());

    servo.sweep_step();
    servo.sweep_step();
    assert_eq!(servo.read(), 20);
    tick(&servos);
    assert_eq!(servo.read(), 20);
}

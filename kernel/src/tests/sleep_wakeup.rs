//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

// 测试：sleep / alarm / pause

use super::harness::{assert_quiescent, boot, return_to_user, run_ticks, start, state_of, task, Frame, Trace};
use crate::process::TaskState;
use crate::signal::Signal;

#[test]
fn test_sleep_runs_until_deadline() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let t = t.clone();
        k.create(task(k, move |k| {
            let left = k.sleep(5);
            t.push(format!("left {} at tick {}", left, k.ticks()));
            0
        }))
        .unwrap();
    });

    assert_eq!(state_of(k, 2), Some(TaskState::Sleeping));
    assert_eq!(k.pending_timers(), 1);
    run_ticks(k, 4);
    assert_eq!(state_of(k, 2), Some(TaskState::Sleeping));
    run_ticks(k, 1);

    assert_eq!(trace.events(), vec!["left 0 at tick 5"]);
    assert_eq!(state_of(k, 2), Some(TaskState::Zombie));
    assert_eq!(k.pending_timers(), 0);
    assert_quiescent(k);
}

#[test]
fn test_interrupted_sleep_reports_remaining_ticks() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let t = t.clone();
        k.create(task(k, move |k| {
            t.push(format!("left {}", k.sleep(100)));
            return_to_user(k, &mut Frame::user(0x1000));
            0
        }))
        .unwrap();
    });

    run_ticks(k, 30);
    k.raise(2, Signal::SIGUSR1).unwrap();
    k.idle_step();

    assert_eq!(trace.events(), vec!["left 70"]);
    assert_eq!(k.task_info(2).unwrap().exit_code, 138);
    assert_eq!(k.pending_timers(), 0);
    assert_quiescent(k);
}

#[test]
fn test_ignored_signal_does_not_cut_sleep_short() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let t = t.clone();
        k.create(task(k, move |k| {
            t.push(format!("left {}", k.sleep(10)));
            0
        }))
        .unwrap();
    });

    run_ticks(k, 3);
    k.raise(2, Signal::SIGCHLD).unwrap();
    k.idle_step();
    assert_eq!(state_of(k, 2), Some(TaskState::Sleeping));
    run_ticks(k, 7);

    assert_eq!(trace.events(), vec!["left 0"]);
    assert_quiescent(k);
}

#[test]
fn test_alarm_delivers_sigalrm() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let t = t.clone();
        k.create(task(k, move |k| {
            t.push(format!("first {}", k.alarm(10)));
            // 替换旧闹钟，返回旧闹钟剩余的 tick
            t.push(format!("second {}", k.alarm(20)));
            let _ = k.pause();
            t.push(format!("woke at tick {}", k.ticks()));
            return_to_user(k, &mut Frame::user(0x1000));
            0
        }))
        .unwrap();
    });

    run_ticks(k, 19);
    assert_eq!(state_of(k, 2), Some(TaskState::Sleeping));
    run_ticks(k, 1);

    assert_eq!(
        trace.events(),
        vec!["first 0", "second 10", "woke at tick 20"]
    );
    assert_eq!(k.task_info(2).unwrap().exit_code, 142);
    assert_quiescent(k);
}

#[test]
fn test_alarm_zero_cancels() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let t = t.clone();
        k.create(task(k, move |k| {
            k.alarm(30);
            k.sleep(5);
            t.push(format!("cancel {}", k.alarm(0)));
            t.push(format!("timers {}", k.pending_timers()));
            0
        }))
        .unwrap();
    });

    run_ticks(k, 5);
    assert_eq!(trace.events(), vec!["cancel 25", "timers 0"]);
    assert_quiescent(k);
}

#[test]
fn test_exit_cancels_owned_timers() {
    let k = boot();
    start(k, |k| {
        k.create(task(k, |k| {
            k.alarm(50);
            0
        }))
        .unwrap();
    });

    assert_eq!(state_of(k, 2), Some(TaskState::Zombie));
    assert_eq!(k.pending_timers(), 0);
    run_ticks(k, 60);
    assert_eq!(k.task_info(1).unwrap().state, TaskState::Sleeping);
    assert_quiescent(k);
}

#[test]
fn test_huge_timeouts_never_fire_early() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let t = t.clone();
        k.create(task(k, move |k| {
            k.sleep(3);
            t.push(format!("alarm {}", k.alarm(u64::MAX)));
            t.push(format!("left {}", k.sleep(u64::MAX)));
            return_to_user(k, &mut Frame::user(0x1000));
            0
        }))
        .unwrap();
    });

    run_ticks(k, 23);
    assert_eq!(state_of(k, 2), Some(TaskState::Sleeping));
    assert_eq!(k.pending_timers(), 2);

    k.raise(2, Signal::SIGUSR1).unwrap();
    k.idle_step();

    assert_eq!(
        trace.events(),
        vec!["alarm 0".to_string(), format!("left {}", u64::MAX - 23)]
    );
    assert_eq!(k.task_info(2).unwrap().exit_code, 138);
    assert_eq!(k.pending_timers(), 0);
    assert_quiescent(k);
}

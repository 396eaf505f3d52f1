//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

// 测试：轮转调度

use super::harness::{assert_quiescent, boot, start, task, Trace};
use crate::errno::Errno;
use crate::process::TaskState;

#[test]
fn test_round_robin_follows_insertion_order() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        for _ in 0..3 {
            let t = t.clone();
            k.create(task(k, move |k| {
                for _ in 0..3 {
                    t.push(format!("{}", k.getpid()));
                    k.yield_now();
                }
                0
            }))
            .unwrap();
        }
    });

    let order: Vec<String> = ["2", "3", "4"].iter().cycle().take(9).map(|s| s.to_string()).collect();
    assert_eq!(trace.events(), order);
    assert_eq!(k.children_of(1), Some(vec![2, 3, 4]));
    for pid in 2..=4 {
        assert_eq!(k.task_info(pid).unwrap().state, TaskState::Zombie);
    }
    assert_quiescent(k);
}

#[test]
fn test_idle_runs_when_nothing_is_runnable() {
    let k = boot();
    start(k, |_| {});

    let switches = k.arch().switches();
    k.idle_step();
    k.schedule();
    assert_eq!(k.arch().switches(), switches);
    assert_eq!(k.current_pid(), 0);
    assert_eq!(k.task_info(1).unwrap().state, TaskState::Sleeping);
    assert_quiescent(k);
}

#[test]
fn test_idle_cannot_create_tasks() {
    let k = boot();
    assert_eq!(k.create(task(k, |_| 0)), Err(Errno::OperationNotPermitted));
    assert_eq!(k.all_pids(), vec![0]);

    start(k, |_| {});
    // init 只能创建一次
    assert_eq!(
        k.spawn_init(task(k, |_| 0), None),
        Err(Errno::OperationNotPermitted)
    );
    assert_eq!(k.all_pids(), vec![0, 1]);
}

#[test]
fn test_cpu_time_is_accounted_on_switch_out() {
    let k = boot();
    start(k, |k| {
        k.create(task(k, |k| {
            for _ in 0..3 {
                k.timer_tick();
            }
            0
        }))
        .unwrap();
    });

    let info = k.task_info(2).unwrap();
    assert_eq!(info.state, TaskState::Zombie);
    assert_eq!(info.cpu_ticks, 3);
    assert_eq!(k.ticks(), 3);
    assert_quiescent(k);
}

#[test]
fn test_new_task_runs_in_copied_address_space() {
    let k = boot();
    let trace = Trace::new();
    let t = trace.clone();
    start(k, move |k| {
        let t = t.clone();
        k.create(task(k, move |k| {
            t.push(format!("{:?}", k.arch().active_space()));
            0
        }))
        .unwrap();
    });

    // init 的地址空间是 1，第一个复制出来的是 100
    assert_eq!(trace.events(), vec!["Some(100)".to_string()]);
    assert_quiescent(k);
}

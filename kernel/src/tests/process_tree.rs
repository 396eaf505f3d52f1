//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

// 测试：进程树与孤儿过继

use super::harness::{assert_quiescent, boot, start, state_of, task, Trace};
use crate::errno::Errno;
use crate::process::{TaskState, WaitFilter, WaitStatus};

#[test]
fn test_orphans_are_adopted_by_init() {
    let k = boot();
    start(k, |k| {
        k.create(task(k, |k| {
            // A1 很快退出，A2 一直睡着
            k.create(task(k, |_| 1)).unwrap();
            k.create(task(k, |k| loop {
                let _ = k.pause();
            }))
            .unwrap();
            7
        }))
        .unwrap();
    });

    // P = 2, A1 = 3, A2 = 4
    assert_eq!(k.children_of(1), Some(vec![2, 3, 4]));
    assert_eq!(k.task_info(3).unwrap().ppid, Some(1));
    assert_eq!(k.task_info(4).unwrap().ppid, Some(1));
    assert_eq!(k.children_of(2), Some(vec![]));
    assert_eq!(state_of(k, 2), Some(TaskState::Zombie));
    assert_eq!(state_of(k, 3), Some(TaskState::Zombie));
    assert_eq!(state_of(k, 4), Some(TaskState::Sleeping));
    assert_eq!(k.task_info(2).unwrap().exit_code, 7);
    assert_quiescent(k);
}

#[test]
fn test_adopted_zombies_wake_waiting_init() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        k.create(task(k, |k| {
            k.create(task(k, |_| 11)).unwrap();
            k.create(task(k, |_| 12)).unwrap();
            // 让两个子进程先变成僵尸，再退出
            k.yield_now();
            3
        }))
        .unwrap();

        loop {
            match k.wait_for_child(WaitFilter::Any, false) {
                Ok(WaitStatus::Exited { pid, code }) => t.push(format!("{}:{}", pid, code)),
                Ok(WaitStatus::NotReady) => unreachable!(),
                Err(err) => {
                    t.push(format!("{}", err.name()));
                    break;
                }
            }
        }
    });

    // 全局链表顺序：A1, A2, P
    assert_eq!(trace.events(), vec!["3:11", "4:12", "2:3", "ECHILD"]);
    assert_eq!(k.all_pids(), vec![0, 1]);
    assert_eq!(k.arch().destroyed_contexts().len(), 3);
    assert_quiescent(k);
}

#[test]
fn test_tree_stays_consistent_under_churn() {
    let k = boot();
    start(k, |k| {
        for _ in 0..4 {
            k.create(task(k, |k| {
                for _ in 0..2 {
                    k.create(task(k, |k| {
                        k.yield_now();
                        0
                    }))
                    .unwrap();
                }
                assert_eq!(k.check_invariants(), Ok(()));
                0
            }))
            .unwrap();
        }
        assert_eq!(k.check_invariants(), Ok(()));
    });

    let mut children = k.children_of(1).unwrap();
    assert_eq!(children.len(), 12);
    children.sort_unstable();
    assert_eq!(children, (2..=13).collect::<Vec<_>>());
    for pid in 2..=13 {
        assert_eq!(state_of(k, pid), Some(TaskState::Zombie));
    }
    assert_quiescent(k);
}

#[test]
fn test_identity_and_process_groups() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        t.push(format!("init pgid {}", k.getpgid(0).unwrap()));
        let child = k.create(task(k, |k| {
            let _ = k.pause();
            0
        }))
        .unwrap();
        t.push(format!("child pgid {}", k.getpgid(child).unwrap()));

        k.setpgid(child, 0).unwrap();
        t.push(format!("child pgid {}", k.getpgid(child).unwrap()));
        // 不存在的进程组
        t.push(format!("{:?}", k.setpgid(child, 999)));
        t.push(format!("{:?}", k.setpgid(4242, 0)));
        t.push(format!("{:?}", k.getpgid(4242)));
        t.push(format!("ppid {}", k.getppid()));
    });

    assert_eq!(
        trace.events(),
        vec![
            "init pgid 1".to_string(),
            "child pgid 1".to_string(),
            "child pgid 2".to_string(),
            format!("{:?}", Err::<(), _>(Errno::OperationNotPermitted)),
            format!("{:?}", Err::<(), _>(Errno::NoSuchProcess)),
            format!("{:?}", Err::<u32, _>(Errno::NoSuchProcess)),
            "ppid 0".to_string(),
        ]
    );
    assert_quiescent(k);
}

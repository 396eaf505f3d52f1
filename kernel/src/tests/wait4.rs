//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

// 测试：wait4 / waitpid

use super::harness::{assert_quiescent, boot, return_to_user, start, task, Frame, Trace};
use crate::errno::Errno;
use crate::process::{WaitFilter, WaitStatus};
use crate::signal::Signal;

/// 一直睡在 pause() 里，被信号打断就走一次返回用户态的路径
fn sleeper(k: &'static super::harness::K) -> i32 {
    let mut frame = Frame::user(0x2000);
    loop {
        if k.pause().is_err() {
            return_to_user(k, &mut frame);
        }
    }
}

#[test]
fn test_no_children_is_echild() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        t.push(format!("{:?}", k.wait_for_child(WaitFilter::Any, false)));
        t.push(format!("{:?}", k.wait_for_child(WaitFilter::Any, true)));
    });

    let echild = format!("{:?}", Err::<WaitStatus, _>(Errno::NoChild));
    assert_eq!(trace.events(), vec![echild.clone(), echild]);
    assert_quiescent(k);
}

#[test]
fn test_no_hang_then_blocking_wait() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let child = k.create(task(k, sleeper)).unwrap();
        t.push(format!("{:?}", k.wait_for_child(WaitFilter::Any, true)));
        k.raise(child, Signal::SIGKILL).unwrap();
        t.push(format!("{:?}", k.wait_for_child(WaitFilter::Any, false)));
    });

    assert_eq!(
        trace.events(),
        vec![
            format!("{:?}", Ok::<_, Errno>(WaitStatus::NotReady)),
            format!("{:?}", Ok::<_, Errno>(WaitStatus::Exited { pid: 2, code: 137 })),
        ]
    );
    assert_quiescent(k);
}

#[test]
fn test_reap_is_idempotent() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let child = k.create(task(k, |_| 5)).unwrap();
        t.push(format!("{:?}", k.wait_for_child(WaitFilter::Pid(child), false)));
        t.push(format!("{:?}", k.wait_for_child(WaitFilter::Pid(child), false)));
        t.push(format!("{:?}", k.wait_for_child(WaitFilter::Any, true)));
    });

    let echild = format!("{:?}", Err::<WaitStatus, _>(Errno::NoChild));
    assert_eq!(
        trace.events(),
        vec![
            format!("{:?}", Ok::<_, Errno>(WaitStatus::Exited { pid: 2, code: 5 })),
            echild.clone(),
            echild,
        ]
    );
    assert_eq!(k.arch().destroyed_contexts().len(), 1);
    assert!(k.task_info(2).is_none());
    assert_quiescent(k);
}

#[test]
fn test_filters_select_children() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let c1 = k.create(task(k, |_| 1)).unwrap();
        let c2 = k.create(task(k, |_| 2)).unwrap();
        let c3 = k.create(task(k, |_| 3)).unwrap();
        k.setpgid(c3, 0).unwrap();

        for filter in [
            WaitFilter::Pid(c2),
            WaitFilter::Group(c3),
            WaitFilter::Group(999),
            WaitFilter::from_raw(0),
            WaitFilter::Pid(c1),
        ] {
            match k.wait_for_child(filter, false) {
                Ok(WaitStatus::Exited { pid, code }) => t.push(format!("{}:{}", pid, code)),
                other => t.push(format!("{:?}", other)),
            }
        }
    });

    assert_eq!(
        trace.events(),
        vec![
            "3:2".to_string(),
            "4:3".to_string(),
            format!("{:?}", Err::<WaitStatus, _>(Errno::NoChild)),
            "2:1".to_string(),
            format!("{:?}", Err::<WaitStatus, _>(Errno::NoChild)),
        ]
    );
    assert_quiescent(k);
}

#[test]
fn test_blocked_wait_interrupted_by_signal() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        k.create(task(k, |k| {
            k.raise(1, Signal::SIGUSR1).unwrap();
            sleeper(k)
        }))
        .unwrap();
        t.push(format!("{:?}", k.wait_for_child(WaitFilter::Any, false)));
    });

    assert_eq!(
        trace.events(),
        vec![format!("{:?}", Err::<WaitStatus, _>(Errno::InterruptedSystemCall))]
    );
    assert_quiescent(k);
}

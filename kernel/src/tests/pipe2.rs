//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

// 测试：管道的阻塞读写、EOF 与 SIGPIPE

use super::harness::{assert_quiescent, boot, return_to_user, start, state_of, task, Frame, Trace};
use crate::config::PIPE_CAPACITY;
use crate::errno::Errno;
use crate::process::{WaitFilter, WaitStatus};
use crate::signal::{SigAction, Signal};

fn exited(pid: u32, code: i32) -> String {
    format!("{:?}", Ok::<_, Errno>(WaitStatus::Exited { pid, code }))
}

#[test]
fn test_blocked_reader_receives_whole_write() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let [r, w] = k.sys_pipe().unwrap();
        let t2 = t.clone();
        k.create(task(k, move |k| {
            let mut buf = [0u8; 64];
            let n = k.sys_read(r, &mut buf).unwrap();
            t2.push(String::from_utf8_lossy(&buf[..n]).into_owned());
            n as i32
        }))
        .unwrap();

        // 读者先进入等待
        k.yield_now();
        t.push(format!("write {:?}", k.sys_write(w, b"hello pipe")));
        t.push(format!("{:?}", k.wait_for_child(WaitFilter::Any, false)));
    });

    assert_eq!(
        trace.events(),
        vec![
            "write Ok(10)".to_string(),
            "hello pipe".to_string(),
            exited(2, 10),
        ]
    );
    assert_quiescent(k);
}

#[test]
fn test_last_writer_close_gives_eof() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let [r, w] = k.sys_pipe().unwrap();
        let t2 = t.clone();
        k.create(task(k, move |k| {
            k.sys_close(w).unwrap();
            let mut buf = [0u8; 16];
            t2.push(format!("read {:?}", k.sys_read(r, &mut buf)));
            0
        }))
        .unwrap();

        k.yield_now();
        k.sys_close(w).unwrap();
        t.push(format!("{:?}", k.wait_for_child(WaitFilter::Any, false)));
    });

    assert_eq!(trace.events(), vec!["read Ok(0)".to_string(), exited(2, 0)]);
    assert_quiescent(k);
}

#[test]
fn test_write_without_readers_raises_sigpipe() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let [r, w] = k.sys_pipe().unwrap();
        k.sys_close(r).unwrap();
        let t2 = t.clone();
        k.create(task(k, move |k| {
            t2.push(format!("{:?}", k.sys_write(w, b"data")));
            t2.push(format!("pending {}", k.sigpending().contains(Signal::SIGPIPE)));
            return_to_user(k, &mut Frame::user(0x1000));
            t2.push("still running");
            0
        }))
        .unwrap();
        t.push(format!("{:?}", k.wait_for_child(WaitFilter::Any, false)));
    });

    assert_eq!(
        trace.events(),
        vec![
            format!("{:?}", Err::<usize, _>(Errno::BrokenPipe)),
            "pending true".to_string(),
            exited(2, 141),
        ]
    );
    assert_quiescent(k);
}

#[test]
fn test_blocked_writer_sees_reader_close() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let [r, w] = k.sys_pipe().unwrap();
        let t2 = t.clone();
        k.create(task(k, move |k| {
            k.sigaction(Signal::SIGPIPE, Some(SigAction::ignore())).unwrap();
            k.sys_close(r).unwrap();
            let fill = vec![7u8; PIPE_CAPACITY];
            t2.push(format!("fill {:?}", k.sys_write(w, &fill)));
            // 缓冲区已满，这次写会阻塞
            t2.push(format!("{:?}", k.sys_write(w, b"x")));
            0
        }))
        .unwrap();

        k.yield_now();
        t.push("closing reader");
        k.sys_close(r).unwrap();
        t.push(format!("{:?}", k.wait_for_child(WaitFilter::Any, false)));
    });

    assert_eq!(
        trace.events(),
        vec![
            format!("fill Ok({})", PIPE_CAPACITY),
            "closing reader".to_string(),
            format!("{:?}", Err::<usize, _>(Errno::BrokenPipe)),
            exited(2, 0),
        ]
    );
    assert_quiescent(k);
}

#[test]
fn test_large_transfer_keeps_order() {
    const TOTAL: usize = PIPE_CAPACITY * 8 + 123;
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let [r, w] = k.sys_pipe().unwrap();
        let writer = k
            .create(task(k, move |k| {
                k.sys_close(r).unwrap();
                let data: Vec<u8> = (0..TOTAL).map(|i| (i % 251) as u8).collect();
                let mut sent = 0;
                while sent < data.len() {
                    sent += k.sys_write(w, &data[sent..]).unwrap();
                }
                0
            }))
            .unwrap();
        let reader = k
            .create(task(k, move |k| {
                k.sys_close(w).unwrap();
                let mut got = Vec::new();
                let mut buf = [0u8; 300];
                loop {
                    match k.sys_read(r, &mut buf) {
                        Ok(0) => break,
                        Ok(n) => got.extend_from_slice(&buf[..n]),
                        Err(_) => return 2,
                    }
                }
                let ok = got.len() == TOTAL && got.iter().enumerate().all(|(i, &b)| b == (i % 251) as u8);
                if ok {
                    0
                } else {
                    1
                }
            }))
            .unwrap();
        k.sys_close(r).unwrap();
        k.sys_close(w).unwrap();

        for pid in [writer, reader] {
            t.push(format!("{:?}", k.wait_for_child(WaitFilter::Pid(pid), false)));
        }
    });

    assert_eq!(trace.events(), vec![exited(2, 0), exited(3, 0)]);
    assert_quiescent(k);
}

#[test]
fn test_round_trip_and_descriptor_errors() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let [r, w] = k.sys_pipe().unwrap();
        let data: Vec<u8> = (0..300u32).map(|i| (i * 7) as u8).collect();
        t.push(format!("{:?}", k.sys_write(w, &data)));

        let r2 = k.sys_dup(r).unwrap();
        t.push(format!("dup {}", r2));
        let mut out = vec![0u8; 300];
        t.push(format!("{:?}", k.sys_read(r2, &mut out)));
        t.push(format!("same {}", out == data));

        t.push(format!("{:?}", k.sys_read(r, &mut [])));
        t.push(format!("{:?}", k.sys_write(w, &[])));
        t.push(format!("{:?}", k.sys_read(w, &mut out)));
        k.sys_close(r2).unwrap();
        t.push(format!("{:?}", k.sys_close(r2)));
        t.push(format!("{:?}", k.sys_write(99, b"x")));
    });

    let ebadf = format!("{:?}", Err::<usize, _>(Errno::BadFileNumber));
    assert_eq!(
        trace.events(),
        vec![
            "Ok(300)".to_string(),
            "dup 2".to_string(),
            "Ok(300)".to_string(),
            "same true".to_string(),
            "Ok(0)".to_string(),
            "Ok(0)".to_string(),
            ebadf.clone(),
            format!("{:?}", Err::<(), _>(Errno::BadFileNumber)),
            ebadf,
        ]
    );
    assert_quiescent(k);
}

#[test]
fn test_blocked_reader_interrupted_by_signal() {
    let k = boot();
    let trace = Trace::new();

    let t = trace.clone();
    start(k, move |k| {
        let [r, _w] = k.sys_pipe().unwrap();
        let t2 = t.clone();
        let child = k
            .create(task(k, move |k| {
                let mut buf = [0u8; 8];
                t2.push(format!("{:?}", k.sys_read(r, &mut buf)));
                return_to_user(k, &mut Frame::user(0x1000));
                0
            }))
            .unwrap();

        k.yield_now();
        // SIGCHLD 是默认忽略的，读者被唤醒后继续等待
        k.raise(child, Signal::SIGCHLD).unwrap();
        k.yield_now();
        t.push(format!("{:?}", state_of(k, child)));
        k.raise(child, Signal::SIGUSR1).unwrap();
        t.push(format!("{:?}", k.wait_for_child(WaitFilter::Any, false)));
    });

    assert_eq!(
        trace.events(),
        vec![
            "Some(Sleeping)".to_string(),
            format!("{:?}", Err::<usize, _>(Errno::InterruptedSystemCall)),
            exited(2, 138),
        ]
    );
    assert_quiescent(k);
}

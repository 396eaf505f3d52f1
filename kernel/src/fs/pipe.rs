//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 管道 (Pipe)
//!
//! 遵循 Linux 内核的管道设计 (fs/pipe.c, include/linux/pipe_fs_i.h)
//!
//! 核心概念：
//! - `RingBuffer`: 环形缓冲区，多留一个字节区分空和满
//! - `Pipe`: 缓冲区、读写端计数和阻塞计数都放在同一个条件变量的锁里
//! - `PipeReader` / `PipeWriter`: 两端的文件操作，最后一个引用释放时
//!   减少端计数并唤醒对端 (pipe_release)
//!
//! 任何可能让对端永远等下去的状态变化（最后一个读端或写端关闭）
//! 都会先唤醒对端，所以至多只有一方会因为等待不会发生的事件而阻塞。

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::min;

use crate::errno::{Errno, KResult};
use crate::fs::file::FileOps;
use crate::sched::SchedContext;
use crate::signal::Signal;
use crate::sync::ConditionVariable;

/// 环形缓冲区
///
/// 对应 Linux 的 struct pipe_buffer (include/linux/pipe_fs_i.h)，
/// 这里用一段连续内存加读写指针实现
pub struct RingBuffer {
    data: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl RingBuffer {
    /// 创建可容纳 `capacity` 字节的缓冲区
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity + 1],
            read_pos: 0,
            write_pos: 0,
        }
    }

    #[inline]
    fn size(&self) -> usize {
        self.data.len()
    }

    /// 可容纳的字节数
    pub fn capacity(&self) -> usize {
        self.size() - 1
    }

    /// 获取可用读取字节数
    pub fn available_read(&self) -> usize {
        if self.write_pos >= self.read_pos {
            self.write_pos - self.read_pos
        } else {
            self.size() - self.read_pos + self.write_pos
        }
    }

    /// 获取可用写入空间
    pub fn available_write(&self) -> usize {
        self.capacity() - self.available_read()
    }

    pub fn is_empty(&self) -> bool {
        self.read_pos == self.write_pos
    }

    pub fn is_full(&self) -> bool {
        self.available_write() == 0
    }

    /// 读取数据，返回实际读取的字节数
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let to_read = min(self.available_read(), buf.len());
        let first = min(to_read, self.size() - self.read_pos);
        buf[..first].copy_from_slice(&self.data[self.read_pos..self.read_pos + first]);
        buf[first..to_read].copy_from_slice(&self.data[..to_read - first]);
        self.read_pos = (self.read_pos + to_read) % self.size();
        to_read
    }

    /// 写入数据，返回实际写入的字节数
    pub fn write(&mut self, buf: &[u8]) -> usize {
        let to_write = min(self.available_write(), buf.len());
        let first = min(to_write, self.size() - self.write_pos);
        self.data[self.write_pos..self.write_pos + first].copy_from_slice(&buf[..first]);
        self.data[..to_write - first].copy_from_slice(&buf[first..to_write]);
        self.write_pos = (self.write_pos + to_write) % self.size();
        to_write
    }
}

/// 管道状态
///
/// 对应 Linux 的 struct pipe_inode_info 中的 readers / writers /
/// r_counter / w_counter
struct PipeState {
    ring: RingBuffer,
    readers: usize,
    writers: usize,
    blocked_readers: usize,
    blocked_writers: usize,
}

/// 管道信息
pub struct Pipe {
    state: ConditionVariable<PipeState>,
}

impl Pipe {
    /// 创建管道，返回读端和写端
    ///
    /// 对应 Linux 的 create_pipe_files()
    pub fn create(capacity: usize) -> (PipeReader, PipeWriter) {
        let pipe = Arc::new(Pipe {
            state: ConditionVariable::new(PipeState {
                ring: RingBuffer::new(capacity),
                readers: 1,
                writers: 1,
                blocked_readers: 0,
                blocked_writers: 0,
            }),
        });
        (
            PipeReader { pipe: pipe.clone() },
            PipeWriter { pipe },
        )
    }

    /// 从管道读取
    ///
    /// 对应 Linux 的 pipe_read()
    fn read(&self, ctx: &dyn SchedContext, buf: &mut [u8]) -> KResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut copied = 0;
        let mut state = self.state.lock();
        loop {
            if state.ring.is_empty() {
                // 没有写端：到达文件末尾
                if state.writers == 0 {
                    break;
                }
                // 已经读到数据，且没有写者正在等待腾出空间
                if copied > 0 && state.blocked_writers == 0 {
                    break;
                }
                if ctx.signal_pending() {
                    if copied > 0 {
                        break;
                    }
                    return Err(Errno::InterruptedSystemCall);
                }

                state.blocked_readers += 1;
                state.broadcast();
                state = self.state.wait(state, ctx);
                state.blocked_readers -= 1;
                continue;
            }

            copied += state.ring.read(&mut buf[copied..]);
            state.broadcast();
            if copied == buf.len() {
                break;
            }
        }
        Ok(copied)
    }

    /// 向管道写入
    ///
    /// 对应 Linux 的 pipe_write()。没有读端时向当前任务发送 SIGPIPE，
    /// 一个字节都没写入时返回 EPIPE，否则返回已写入的字节数。
    fn write(&self, ctx: &dyn SchedContext, buf: &[u8]) -> KResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        let mut state = self.state.lock();
        loop {
            if state.readers == 0 {
                drop(state);
                log::debug!("pipe: write with no readers, raising SIGPIPE");
                ctx.raise_current(Signal::SIGPIPE);
                return if written == 0 {
                    Err(Errno::BrokenPipe)
                } else {
                    Ok(written)
                };
            }

            if state.ring.is_full() {
                if written > 0 && state.blocked_readers == 0 {
                    break;
                }
                if ctx.signal_pending() {
                    if written > 0 {
                        break;
                    }
                    return Err(Errno::InterruptedSystemCall);
                }

                state.blocked_writers += 1;
                state.broadcast();
                state = self.state.wait(state, ctx);
                state.blocked_writers -= 1;
                continue;
            }

            written += state.ring.write(&buf[written..]);
            state.broadcast();
            if written == buf.len() {
                break;
            }
        }
        Ok(written)
    }
}

/// 管道读端
pub struct PipeReader {
    pipe: Arc<Pipe>,
}

/// 管道写端
pub struct PipeWriter {
    pipe: Arc<Pipe>,
}

impl PipeReader {
    pub fn pipe(&self) -> &Arc<Pipe> {
        &self.pipe
    }
}

impl PipeWriter {
    pub fn pipe(&self) -> &Arc<Pipe> {
        &self.pipe
    }
}

impl FileOps for PipeReader {
    fn read(&self, ctx: &dyn SchedContext, buf: &mut [u8]) -> KResult<usize> {
        self.pipe.read(ctx, buf)
    }
}

impl FileOps for PipeWriter {
    fn write(&self, ctx: &dyn SchedContext, buf: &[u8]) -> KResult<usize> {
        self.pipe.write(ctx, buf)
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        let mut state = self.pipe.state.lock();
        state.readers -= 1;
        if state.readers == 0 {
            let woken = state.broadcast();
            log::trace!("pipe: last reader closed, woke {} task(s)", woken);
        }
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        let mut state = self.pipe.state.lock();
        state.writers -= 1;
        if state.writers == 0 {
            let woken = state.broadcast();
            log::trace!("pipe: last writer closed, woke {} task(s)", woken);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_keeps_one_byte_of_slack() {
        let mut ring = RingBuffer::new(4);
        assert!(ring.is_empty());
        assert_eq!(ring.write(b"abcdef"), 4);
        assert!(ring.is_full());
        assert_eq!(ring.available_read(), 4);
        assert_eq!(ring.write(b"x"), 0);
    }

    #[test]
    fn test_ring_wraps_around() {
        let mut ring = RingBuffer::new(5);
        let mut out = [0u8; 8];

        assert_eq!(ring.write(b"abcd"), 4);
        assert_eq!(ring.read(&mut out[..3]), 3);
        assert_eq!(&out[..3], b"abc");

        // 写指针绕回缓冲区开头
        assert_eq!(ring.write(b"efgh"), 4);
        assert_eq!(ring.available_read(), 5);
        assert!(ring.is_full());

        assert_eq!(ring.read(&mut out), 5);
        assert_eq!(&out[..5], b"defgh");
        assert!(ring.is_empty());
        assert_eq!(ring.available_write(), 5);
    }

    #[test]
    fn test_last_end_close_updates_counts() {
        let (reader, writer) = Pipe::create(8);
        let pipe = reader.pipe().clone();
        drop(writer);
        assert_eq!(pipe.state.lock().writers, 0);
        assert_eq!(pipe.state.lock().readers, 1);
        drop(reader);
        assert_eq!(pipe.state.lock().readers, 0);
    }
}

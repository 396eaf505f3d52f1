//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 文件对象
//!
//! 遵循 Linux 内核的文件对象设计 (fs/file_table.c, include/linux/fs.h)
//!
//! 核心概念：
//! - `File`: 打开的文件对象，通过 `Arc` 在多个文件描述符、多个任务之间共享
//! - `FileOps`: 文件操作 (struct file_operations)
//! - 最后一个 `Arc<File>` 被释放时，`FileOps` 实现者的 `Drop` 负责收尾
//!   （对应 Linux 的 fput() -> __fput() -> f_op->release()）

use alloc::boxed::Box;
use alloc::sync::Arc;

use bitflags::bitflags;

use crate::errno::{Errno, KResult};
use crate::sched::SchedContext;

bitflags! {
    /// 打开模式 (FMODE_READ / FMODE_WRITE)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileMode: u32 {
        const READ = 0x1;
        const WRITE = 0x2;
    }
}

/// 文件操作
///
/// 对应 Linux 的 struct file_operations (include/linux/fs.h)。
/// 阻塞型实现通过 `ctx` 挂起当前任务。
pub trait FileOps: Send + Sync {
    fn read(&self, ctx: &dyn SchedContext, buf: &mut [u8]) -> KResult<usize> {
        let _ = (ctx, buf);
        Err(Errno::InvalidArgument)
    }

    fn write(&self, ctx: &dyn SchedContext, buf: &[u8]) -> KResult<usize> {
        let _ = (ctx, buf);
        Err(Errno::InvalidArgument)
    }
}

/// 文件对象
///
/// 对应 Linux 的 struct file
pub struct File {
    mode: FileMode,
    ops: Box<dyn FileOps>,
}

impl File {
    pub fn new(mode: FileMode, ops: Box<dyn FileOps>) -> Arc<File> {
        Arc::new(Self { mode, ops })
    }

    #[inline]
    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// 读取文件，未以读模式打开时返回 EBADF
    pub fn read(&self, ctx: &dyn SchedContext, buf: &mut [u8]) -> KResult<usize> {
        if !self.mode.contains(FileMode::READ) {
            return Err(Errno::BadFileNumber);
        }
        self.ops.read(ctx, buf)
    }

    /// 写入文件，未以写模式打开时返回 EBADF
    pub fn write(&self, ctx: &dyn SchedContext, buf: &[u8]) -> KResult<usize> {
        if !self.mode.contains(FileMode::WRITE) {
            return Err(Errno::BadFileNumber);
        }
        self.ops.write(ctx, buf)
    }
}

/// 目录上下文
///
/// 对应 Linux 的 struct fs_struct。路径解析不在内核核心中，
/// 这里只保存根目录和当前目录的句柄，fork 时增加引用计数。
#[derive(Clone, Default)]
pub struct FsContext {
    pub root: Option<Arc<File>>,
    pub cwd: Option<Arc<File>>,
}

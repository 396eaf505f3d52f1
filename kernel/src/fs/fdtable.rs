//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 文件描述符表
//!
//! 对应 Linux 的 struct fdtable (include/linux/fdtable.h)

use alloc::sync::Arc;
use alloc::vec::Vec;

use super::file::File;
use crate::config::MAX_FDS;
use crate::errno::{Errno, KResult};

/// 文件描述符
pub type Fd = usize;

/// 文件描述符表
///
/// 每一项是共享的 `Arc<File>`，复制表项即增加引用计数
#[derive(Default)]
pub struct FdTable {
    files: Vec<Option<Arc<File>>>,
}

impl FdTable {
    pub const fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// 安装文件，使用最小的空闲描述符
    ///
    /// 对应 Linux 的 get_unused_fd_flags() + fd_install()
    pub fn install(&mut self, file: Arc<File>) -> KResult<Fd> {
        if let Some(fd) = self.files.iter().position(Option::is_none) {
            self.files[fd] = Some(file);
            return Ok(fd);
        }
        if self.files.len() >= MAX_FDS {
            return Err(Errno::TooManyOpenFiles);
        }
        self.files.push(Some(file));
        Ok(self.files.len() - 1)
    }

    /// 获取文件对象（增加引用计数）
    pub fn get(&self, fd: Fd) -> KResult<Arc<File>> {
        self.files
            .get(fd)
            .and_then(|slot| slot.clone())
            .ok_or(Errno::BadFileNumber)
    }

    /// 关闭描述符，返回被移除的文件对象
    ///
    /// 调用者在释放所有锁之后再丢弃返回值，最后一个引用的收尾可能会唤醒其他任务
    pub fn close(&mut self, fd: Fd) -> KResult<Arc<File>> {
        let file = self
            .files
            .get_mut(fd)
            .and_then(Option::take)
            .ok_or(Errno::BadFileNumber)?;
        while matches!(self.files.last(), Some(None)) {
            self.files.pop();
        }
        Ok(file)
    }

    /// 复制描述符 (dup)
    pub fn dup(&mut self, fd: Fd) -> KResult<Fd> {
        let file = self.get(fd)?;
        self.install(file)
    }

    /// fork 时复制整张表
    pub fn fork(&self) -> FdTable {
        FdTable {
            files: self.files.clone(),
        }
    }

    /// 当前打开的描述符数量
    pub fn open_count(&self) -> usize {
        self.files.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.open_count() == 0
    }
}

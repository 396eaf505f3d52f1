//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 文件相关系统调用
//!
//! 参考 Linux fs/pipe.c (pipe2)、fs/read_write.c (read/write)、
//! fs/open.c (close)、fs/file.c (dup)
//!
//! 文件对象先在任务表的锁内取出（引用计数加一），读写在锁外进行，
//! 因为读写可能阻塞。被关闭的文件同样在锁外释放。

use alloc::boxed::Box;

use super::fdtable::Fd;
use super::file::{File, FileMode};
use super::pipe::Pipe;
use crate::arch::Arch;
use crate::config::PIPE_CAPACITY;
use crate::errno::KResult;
use crate::kernel::Kernel;

impl<A: Arch> Kernel<A> {
    /// 创建管道，返回 [读端, 写端]
    pub fn sys_pipe(&self) -> KResult<[Fd; 2]> {
        let (reader, writer) = Pipe::create(PIPE_CAPACITY);
        let read_end = File::new(FileMode::READ, Box::new(reader));
        let write_end = File::new(FileMode::WRITE, Box::new(writer));

        let me = self.current();
        let result = {
            let mut table = self.tasks.lock();
            let files = &mut table.task_mut(me).files;
            match files.install(read_end.clone()) {
                Ok(rfd) => match files.install(write_end.clone()) {
                    Ok(wfd) => Ok([rfd, wfd]),
                    Err(err) => {
                        let _ = files.close(rfd);
                        Err(err)
                    }
                },
                Err(err) => Err(err),
            }
        };
        drop(read_end);
        drop(write_end);

        if let Ok([rfd, wfd]) = result {
            log::debug!("pipe: created fds [{}, {}]", rfd, wfd);
        }
        result
    }

    pub fn sys_read(&self, fd: Fd, buf: &mut [u8]) -> KResult<usize> {
        let file = self.tasks.lock().task(self.current()).files.get(fd)?;
        file.read(self, buf)
    }

    pub fn sys_write(&self, fd: Fd, buf: &[u8]) -> KResult<usize> {
        let file = self.tasks.lock().task(self.current()).files.get(fd)?;
        file.write(self, buf)
    }

    pub fn sys_close(&self, fd: Fd) -> KResult<()> {
        let me = self.current();
        let file = self.tasks.lock().task_mut(me).files.close(fd)?;
        drop(file);
        Ok(())
    }

    pub fn sys_dup(&self, fd: Fd) -> KResult<Fd> {
        let me = self.current();
        self.tasks.lock().task_mut(me).files.dup(fd)
    }

    /// 当前任务打开的文件数
    pub fn open_files(&self) -> usize {
        self.tasks.lock().task(self.current()).files.open_count()
    }
}

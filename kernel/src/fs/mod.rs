//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 文件层
//!
//! 内核核心只包含文件对象、文件描述符表和管道，路径解析与具体文件系统
//! 属于外部协作者，通过 [`FileOps`] 接入。

pub mod fdtable;
pub mod file;
pub mod pipe;

mod syscall;

pub use fdtable::{Fd, FdTable};
pub use file::{File, FileMode, FileOps, FsContext};
pub use pipe::{Pipe, PipeReader, PipeWriter, RingBuffer};

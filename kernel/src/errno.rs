//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 标准错误代码定义
//!
//! 和 include/uapi/asm-generic/errno.h 保持一致，只收录内核核心实际会返回的错误

use core::fmt;

/// 标准错误代码
///
/// 使用方法：
/// ```rust
/// use rux_core::errno::{Errno, KResult};
///
/// fn lookup(found: bool) -> KResult<u32> {
///     if !found {
///         return Err(Errno::NoSuchProcess);
///     }
///     Ok(1)
/// }
///
/// // 系统调用返回值使用负数
/// assert_eq!(lookup(false).unwrap_err().as_neg_i32(), -3);
/// ```
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Errno {
    /// Operation not permitted (EPERM, 1)
    OperationNotPermitted = 1,

    /// No such process (ESRCH, 3)
    NoSuchProcess = 3,

    /// Interrupted system call (EINTR, 4)
    InterruptedSystemCall = 4,

    /// Bad file number (EBADF, 9)
    BadFileNumber = 9,

    /// No child processes (ECHILD, 10)
    NoChild = 10,

    /// Try again (EAGAIN, 11)
    TryAgain = 11,

    /// Out of memory (ENOMEM, 12)
    OutOfMemory = 12,

    /// Invalid argument (EINVAL, 22)
    InvalidArgument = 22,

    /// Too many open files (EMFILE, 24)
    TooManyOpenFiles = 24,

    /// Broken pipe (EPIPE, 32)
    BrokenPipe = 32,
}

/// 内核内部统一的结果类型
pub type KResult<T> = Result<T, Errno>;

impl Errno {
    /// 获取错误代码的正数值（用于比较）
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// 获取错误代码的负数值（用于系统调用返回）
    #[inline]
    pub const fn as_neg_i32(self) -> i32 {
        -(self as i32)
    }

    /// 获取错误代码的负数值（isize，用于 read/write 类系统调用返回）
    #[inline]
    pub const fn as_neg_isize(self) -> isize {
        -(self as i32) as isize
    }

    /// 错误名称，例如 "EPIPE"
    pub const fn name(self) -> &'static str {
        match self {
            Errno::OperationNotPermitted => "EPERM",
            Errno::NoSuchProcess => "ESRCH",
            Errno::InterruptedSystemCall => "EINTR",
            Errno::BadFileNumber => "EBADF",
            Errno::NoChild => "ECHILD",
            Errno::TryAgain => "EAGAIN",
            Errno::OutOfMemory => "ENOMEM",
            Errno::InvalidArgument => "EINVAL",
            Errno::TooManyOpenFiles => "EMFILE",
            Errno::BrokenPipe => "EPIPE",
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_i32())
    }
}

/// 常用的错误代码常量
pub mod constants {
    pub const EPERM: i32 = 1;
    pub const ESRCH: i32 = 3;
    pub const EINTR: i32 = 4;
    pub const EBADF: i32 = 9;
    pub const ECHILD: i32 = 10;
    pub const EAGAIN: i32 = 11;
    pub const ENOMEM: i32 = 12;
    pub const EINVAL: i32 = 22;
    pub const EMFILE: i32 = 24;
    pub const EPIPE: i32 = 32;
}

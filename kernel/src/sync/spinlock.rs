//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 自旋锁 (Spinlock)
//!
//! 对应 Linux 的 `include/linux/spinlock.h`，直接使用 `spin` 的 test-and-set 锁：
//! - 获取锁时忙等，直到观察到锁空闲
//! - 不保证公平性（竞争者之间没有先后顺序）
//! - 只用于短小、不会阻塞的临界区
//!
//! 单 CPU 模型下，持有自旋锁期间绝不能调用可能挂起的操作（`schedule()`、
//! 条件变量 `wait()`），否则下一个想拿锁的任务会永远自旋。

/// 保护类型 `T` 的自旋锁
pub type SpinLock<T> = spin::mutex::SpinMutex<T>;

/// RAII 锁守卫，离开作用域时释放锁
pub type SpinLockGuard<'a, T> = spin::mutex::SpinMutexGuard<'a, T>;

//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 场景测试
//!
//! 每个任务跑在自己的宿主线程上，[`harness::ThreadArch`] 在 switch_context
//! 时传递接力棒，任何时刻只有一个任务在执行，交错顺序完全确定。
//! 测试线程本身扮演 idle 任务，系统空闲后在它上面做断言。


mod pipe2;
mod process_tree;
mod scheduler;
mod sleep_wakeup;
mod wait4;

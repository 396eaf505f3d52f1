//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 任务表
//!
//! 所有任务都存放在这里，按 `TaskId` 寻址（带代号的 slot map）。
//! 进程树用三条循环链表表示，对应 Linux task_struct 中的：
//! - `tasks`: 全局任务链表，以 idle 为链首
//! - `children`: 这里只记第一个子进程 (`first_child`)
//! - `sibling`: 同一父进程的子进程之间成环
//!
//! 链表结构损坏属于不可恢复的错误，直接 panic。

use alloc::vec::Vec;

use crate::arch::Arch;
use crate::list::{Links, ListArena};
use super::task::{Pid, Task, TaskId, TaskInfo, TaskState};

/// 节点所在的链
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    /// 全局任务链表
    Tasks,
    /// 兄弟链表
    Sibling,
}

struct Slot<A: Arch> {
    generation: u32,
    task: Option<Task<A>>,
}

/// 子进程扫描结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChildScan {
    /// 找到可以回收的僵尸子进程
    Zombie(TaskId),
    /// 有匹配的子进程，但都还活着
    Alive,
    /// 没有匹配的子进程
    Empty,
}

pub struct TaskTable<A: Arch> {
    slots: Vec<Slot<A>>,
    free: Vec<u32>,
    len: usize,
    idle: TaskId,
    init: Option<TaskId>,
}

impl<A: Arch> TaskTable<A> {
    /// 创建任务表，同时放入 idle 任务
    pub(crate) fn new(idle_pid: Pid) -> Self {
        let idle = TaskId::new(0, 0);
        let mut table = Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            idle,
            init: None,
        };
        let id = table.vacant();
        debug_assert_eq!(id, idle);
        table.fill(id, Task::new_idle(id, idle_pid));
        table
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn idle(&self) -> TaskId {
        self.idle
    }

    #[inline]
    pub fn init(&self) -> Option<TaskId> {
        self.init
    }

    pub(crate) fn set_init(&mut self, id: TaskId) {
        self.init = Some(id);
    }

    /// 预留一个空槽位
    pub(crate) fn vacant(&mut self) -> TaskId {
        match self.free.pop() {
            Some(slot) => TaskId::new(slot, self.slots[slot as usize].generation),
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    task: None,
                });
                TaskId::new((self.slots.len() - 1) as u32, 0)
            }
        }
    }

    /// 把任务放进预留的槽位
    pub(crate) fn fill(&mut self, id: TaskId, task: Task<A>) {
        let slot = &mut self.slots[id.slot()];
        if slot.generation != id.generation() || slot.task.is_some() {
            panic!("task table: slot {} is not vacant", id);
        }
        slot.task = Some(task);
        self.len += 1;
    }

    /// 归还一个预留了但没有用上的槽位
    pub(crate) fn release_vacant(&mut self, id: TaskId) {
        let slot = &mut self.slots[id.slot()];
        if slot.generation == id.generation() && slot.task.is_none() {
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.slot() as u32);
        }
    }

    /// 取出任务并回收槽位，任务必须已经从所有链表上摘下
    fn take(&mut self, id: TaskId) -> Task<A> {
        let slot = match self.slots.get_mut(id.slot()) {
            Some(slot) if slot.generation == id.generation() => slot,
            _ => panic!("task table: stale task id {}", id),
        };
        let task = match slot.task.take() {
            Some(task) => task,
            None => panic!("task table: slot {} is empty", id),
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.slot() as u32);
        self.len -= 1;
        task
    }

    pub fn get(&self, id: TaskId) -> Option<&Task<A>> {
        self.slots
            .get(id.slot())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.task.as_ref())
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task<A>> {
        self.slots
            .get_mut(id.slot())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.task.as_mut())
    }

    /// 按句柄取任务，句柄失效说明内核状态已经不一致
    pub fn task(&self, id: TaskId) -> &Task<A> {
        match self.get(id) {
            Some(task) => task,
            None => panic!("task table: dangling task id {}", id),
        }
    }

    pub fn task_mut(&mut self, id: TaskId) -> &mut Task<A> {
        match self.get_mut(id) {
            Some(task) => task,
            None => panic!("task table: dangling task id {}", id),
        }
    }

    /// 遍历所有任务（按全局链表顺序，从 idle 开始）
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &Task<A>)> + '_ {
        self.list_iter(Chain::Tasks, self.idle).map(move |id| (id, self.task(id)))
    }

    /// 按 PID 查找，僵尸任务也能找到
    pub fn find_by_pid(&self, pid: Pid) -> Option<TaskId> {
        self.iter().find(|(_, t)| t.pid() == pid).map(|(id, _)| id)
    }

    pub fn pid_of(&self, id: TaskId) -> Pid {
        self.task(id).pid()
    }

    pub fn parent_of(&self, id: TaskId) -> Option<TaskId> {
        self.task(id).parent
    }

    /// 子进程列表（按兄弟链表顺序）
    pub fn children(&self, id: TaskId) -> Vec<TaskId> {
        match self.task(id).first_child {
            Some(first) => self.list_iter(Chain::Sibling, first).collect(),
            None => Vec::new(),
        }
    }

    pub fn info(&self, id: TaskId) -> TaskInfo {
        let t = self.task(id);
        TaskInfo {
            pid: t.pid(),
            ppid: t.parent.map(|p| self.pid_of(p)),
            pgid: t.pgid,
            state: t.state(),
            exit_code: t.exit_code,
            cpu_ticks: t.cpu_ticks,
            time_slice: t.time_slice,
        }
    }

    /// 把新任务挂到进程树上
    ///
    /// 全局链表中插在创建者之前；子进程链表中插在末尾
    pub(crate) fn link(&mut self, creator: TaskId, child: TaskId) {
        self.list_add_tail(Chain::Tasks, creator, child);
        self.task_mut(child).parent = Some(creator);
        match self.task(creator).first_child {
            Some(first) => self.list_add_tail(Chain::Sibling, first, child),
            None => {
                self.list_init(Chain::Sibling, child);
                self.task_mut(creator).first_child = Some(child);
            }
        }
    }

    /// 从进程树上摘下并取出一个已退出的任务
    ///
    /// 对应 Linux 的 release_task() -> __unhash_process()
    pub(crate) fn unlink(&mut self, id: TaskId) -> Task<A> {
        if self.task(id).first_child.is_some() {
            panic!("task table: task {} still owns children", id);
        }
        self.list_del(Chain::Tasks, id);

        if let Some(parent) = self.task(id).parent {
            if self.task(parent).first_child == Some(id) {
                let next = if self.list_is_singular(Chain::Sibling, id) {
                    None
                } else {
                    Some(self.list_next(Chain::Sibling, id))
                };
                self.task_mut(parent).first_child = next;
            }
            self.list_del(Chain::Sibling, id);
        }
        self.take(id)
    }

    /// 把 `from` 的子进程全部过继给 `to`，返回被过继的任务
    ///
    /// 先从 `from` 的第一个子进程出发，向前后两个方向找出父进程仍是 `from`
    /// 的那段连续子链，把它切下后拼接到 `to` 的子进程链表末尾。
    /// 这段子链必须覆盖整个兄弟环，否则说明兄弟链表已经损坏。
    ///
    /// 对应 Linux 的 forget_original_parent() (kernel/exit.c)
    pub(crate) fn reparent_children(&mut self, from: TaskId, to: TaskId) -> Vec<TaskId> {
        let first = match self.task(from).first_child {
            Some(first) => first,
            None => return Vec::new(),
        };
        let owned = |table: &Self, id: TaskId| table.task(id).parent == Some(from);

        let mut last = first;
        loop {
            let next = self.list_next(Chain::Sibling, last);
            if next == first || !owned(self, next) {
                break;
            }
            last = next;
        }
        let mut head = first;
        loop {
            let prev = self.list_prev(Chain::Sibling, head);
            if prev == last || !owned(self, prev) {
                break;
            }
            head = prev;
        }
        if self.list_next(Chain::Sibling, last) != head {
            panic!("task table: sibling chain of task {} holds foreign tasks", from);
        }

        self.list_cut(Chain::Sibling, head, last);
        let moved: Vec<TaskId> = self.list_iter(Chain::Sibling, head).collect();
        for &child in &moved {
            self.task_mut(child).parent = Some(to);
        }

        match self.task(to).first_child {
            Some(to_first) => self.list_splice_tail(Chain::Sibling, to_first, head),
            None => self.task_mut(to).first_child = Some(head),
        }
        self.task_mut(from).first_child = None;
        moved
    }

    /// 在全局链表中扫描 `parent` 的子进程
    ///
    /// `matches` 决定哪些子进程在等待范围内
    pub(crate) fn scan_children<F>(&self, parent: TaskId, matches: F) -> ChildScan
    where
        F: Fn(&Task<A>) -> bool,
    {
        let mut result = ChildScan::Empty;
        for (id, task) in self.iter() {
            if task.parent != Some(parent) || !matches(task) {
                continue;
            }
            if task.state() == TaskState::Zombie {
                return ChildScan::Zombie(id);
            }
            result = ChildScan::Alive;
        }
        result
    }

    /// 检查三条链表是否相互一致
    ///
    /// - 全局链表恰好包含每个任务一次，前后指针互相对应
    /// - 每个子进程链表里的任务的父进程都是链表的主人
    /// - 除 idle 外每个任务恰好出现在一个子进程链表中
    pub fn verify(&self) -> Result<(), &'static str> {
        let mut seen = 0;
        for id in self.list_iter(Chain::Tasks, self.idle) {
            seen += 1;
            if seen > self.len {
                return Err("global task list does not close");
            }
            let task = self.get(id).ok_or("global task list references a freed task")?;
            if self.links(Chain::Tasks, task.tasks.next).prev != id {
                return Err("global task list back-link mismatch");
            }
        }
        if seen != self.len {
            return Err("task missing from global task list");
        }

        let mut members = 0;
        for (id, task) in self.iter() {
            if id != self.idle {
                let parent = task.parent.ok_or("non-root task without parent")?;
                if self.get(parent).is_none() {
                    return Err("parent freed before its child");
                }
            }
            let first = match task.first_child {
                Some(first) => first,
                None => continue,
            };
            let mut count = 0;
            for child in self.list_iter(Chain::Sibling, first) {
                count += 1;
                if count > self.len {
                    return Err("sibling list does not close");
                }
                let c = self.get(child).ok_or("sibling list references a freed task")?;
                if c.parent != Some(id) {
                    return Err("sibling list holds a foreign task");
                }
                if self.links(Chain::Sibling, c.sibling.next).prev != child {
                    return Err("sibling list back-link mismatch");
                }
            }
            members += count;
        }
        if members != self.len - 1 {
            return Err("children lists do not cover every task");
        }
        Ok(())
    }
}

impl<A: Arch> ListArena<TaskId> for TaskTable<A> {
    type Chain = Chain;

    fn links(&self, chain: Chain, id: TaskId) -> Links<TaskId> {
        let task = self.task(id);
        match chain {
            Chain::Tasks => task.tasks,
            Chain::Sibling => task.sibling,
        }
    }

    fn links_mut(&mut self, chain: Chain, id: TaskId) -> &mut Links<TaskId> {
        let task = self.task_mut(id);
        match chain {
            Chain::Tasks => &mut task.tasks,
            Chain::Sibling => &mut task.sibling,
        }
    }
}

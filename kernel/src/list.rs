//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 双向循环链表实现
//!
//! 参考 Linux: include/linux/list.h
//!
//! 用途：
//! - 全局任务链表: task_struct::tasks
//! - 进程树: task_struct::children, task_struct::sibling
//!
//! 设计特点：
//! - 节点存放在 arena（任务表）中，链接用稳定的句柄而不是裸指针表示
//! - 同一个节点可以同时挂在多条链上，由 `Chain` 区分
//! - 单节点链表指向自己，和 `INIT_LIST_HEAD` 一致

/// 一条链上的前后链接
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Links<K> {
    /// 前一个节点
    pub prev: K,
    /// 下一个节点
    pub next: K,
}

impl<K: Copy> Links<K> {
    /// 只包含自己的链表（对应 INIT_LIST_HEAD）
    pub const fn singleton(key: K) -> Self {
        Self { prev: key, next: key }
    }
}

/// 以句柄寻址的链表节点容器
///
/// 实现者只需要给出 `links`/`links_mut`，其余操作都由默认方法提供。
/// 句柄无效时实现者应当 panic：链表指向一个不存在的节点说明数据结构已经损坏。
pub trait ListArena<K: Copy + Eq> {
    /// 节点所在的链（一个节点可以同时属于多条链）
    type Chain: Copy;

    fn links(&self, chain: Self::Chain, key: K) -> Links<K>;

    fn links_mut(&mut self, chain: Self::Chain, key: K) -> &mut Links<K>;

    /// 使节点指向自己，形成只有一个节点的链表
    fn list_init(&mut self, chain: Self::Chain, key: K) {
        *self.links_mut(chain, key) = Links::singleton(key);
    }

    /// 链上是否只有这一个节点
    fn list_is_singular(&self, chain: Self::Chain, key: K) -> bool {
        self.links(chain, key).next == key
    }

    fn list_next(&self, chain: Self::Chain, key: K) -> K {
        self.links(chain, key).next
    }

    fn list_prev(&self, chain: Self::Chain, key: K) -> K {
        self.links(chain, key).prev
    }

    /// 在 `head` 之前插入 `node`（循环链表中即为尾部）
    ///
    /// 对应 Linux 的 list_add_tail()
    fn list_add_tail(&mut self, chain: Self::Chain, head: K, node: K) {
        let prev = self.list_prev(chain, head);
        *self.links_mut(chain, node) = Links { prev, next: head };
        self.links_mut(chain, prev).next = node;
        self.links_mut(chain, head).prev = node;
    }

    /// 在 `head` 之后插入 `node`
    ///
    /// 对应 Linux 的 list_add()
    fn list_add(&mut self, chain: Self::Chain, head: K, node: K) {
        let next = self.list_next(chain, head);
        self.list_add_tail(chain, next, node);
    }

    /// 把节点从链上摘下，摘下后节点指向自己
    ///
    /// 对应 Linux 的 list_del_init()
    fn list_del(&mut self, chain: Self::Chain, node: K) {
        let Links { prev, next } = self.links(chain, node);
        self.links_mut(chain, prev).next = next;
        self.links_mut(chain, next).prev = prev;
        self.list_init(chain, node);
    }

    /// 把 `[first, last]` 这段连续节点从所在链上切下，自成一个环
    ///
    /// 如果这段已经是整个环，什么都不做。
    fn list_cut(&mut self, chain: Self::Chain, first: K, last: K) {
        let before = self.list_prev(chain, first);
        if before == last {
            return;
        }
        let after = self.list_next(chain, last);
        self.links_mut(chain, before).next = after;
        self.links_mut(chain, after).prev = before;
        self.links_mut(chain, last).next = first;
        self.links_mut(chain, first).prev = last;
    }

    /// 把 `other` 所在的整个环拼接到 `head` 之前
    ///
    /// 两个环必须互不相交。对应 Linux 的 list_splice_tail()
    fn list_splice_tail(&mut self, chain: Self::Chain, head: K, other: K) {
        let tail = self.list_prev(chain, head);
        let other_tail = self.list_prev(chain, other);
        self.links_mut(chain, tail).next = other;
        self.links_mut(chain, other).prev = tail;
        self.links_mut(chain, other_tail).next = head;
        self.links_mut(chain, head).prev = other_tail;
    }

    /// 从 `start` 开始沿 next 方向遍历整个环，`start` 本身最先返回
    fn list_iter(&self, chain: Self::Chain, start: K) -> ListIter<'_, K, Self> {
        ListIter {
            arena: self,
            chain,
            start,
            next: Some(start),
        }
    }
}

/// 环形链表迭代器
pub struct ListIter<'a, K: Copy + Eq, L: ListArena<K> + ?Sized> {
    arena: &'a L,
    chain: L::Chain,
    start: K,
    next: Option<K>,
}

impl<'a, K: Copy + Eq, L: ListArena<K> + ?Sized> Iterator for ListIter<'a, K, L> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let cur = self.next?;
        let following = self.arena.links(self.chain, cur).next;
        self.next = if following == self.start { None } else { Some(following) };
        Some(cur)
    }
}

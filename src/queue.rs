use parking_lot::{Condvar, Mutex};
use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

/// Неограниченная FIFO очередь с блокирующим `pop`.
///
/// Производители не блокируются, потребители ждут на condvar, пока не
/// появится элемент. Каждый элемент достается ровно одному потребителю.
pub struct BlockingQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// Добавляет `item` и будит одного ожидающего потребителя.
    pub fn push(&self, item: T) {
        {
            let mut items = self.items.lock();
            items.push_back(item);
        }
        self.available.notify_one();
    }

    /// Забирает первый элемент, пока очередь пуста - ждет.
    pub fn pop(&self) -> T {
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return item;
            }
            self.available.wait(&mut items);
        }
    }

    #[inline]
    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Как [`pop`](Self::pop), но сдается по истечении `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.pop());
        };
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            if self.available.wait_until(&mut items, deadline).timed_out() {
                return items.pop_front();
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

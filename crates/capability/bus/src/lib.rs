//! 主题事件总线。
//!
//! 每个订阅者持有自己的有界投递队列；队列满时丢最旧的一条并计数，
//! 发布方永不阻塞。订阅时可以带一段回放前奏（最近站点快照等），
//! 回放事件先于后续实时事件投递。单订阅者内部严格 FIFO；跨订阅者
//! 不保证相对顺序。

use domain::Event;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::Notify;
use tracing::debug;

/// 单订阅者队列容量。
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 64;

struct SubscriberQueue {
    queue: Mutex<VecDeque<Event>>,
    notify: Notify,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl SubscriberQueue {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    fn push(&self, event: Event) {
        {
            let mut queue = lock(&self.queue);
            if queue.len() >= SUBSCRIBER_QUEUE_CAPACITY {
                queue.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                fronius_telemetry::record_event_dropped();
            }
            queue.push_back(event);
        }
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<Event> {
        lock(&self.queue).pop_front()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// 事件总线。
pub struct EventBus {
    subscribers: Mutex<HashMap<u64, Arc<SubscriberQueue>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// 向所有订阅者投递一个事件。
    pub fn publish(&self, event: &Event) {
        let queues: Vec<Arc<SubscriberQueue>> =
            lock(&self.subscribers).values().cloned().collect();
        for queue in queues {
            queue.push(event.clone());
            fronius_telemetry::record_event_published();
        }
    }

    /// 注册订阅者；`replay` 作为回放前奏先行入队。
    pub fn subscribe(self: &Arc<Self>, replay: Vec<Event>) -> Subscription {
        let queue = Arc::new(SubscriberQueue::new());
        for event in replay {
            queue.push(event);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.subscribers).insert(id, queue.clone());
        fronius_telemetry::record_subscriber_connected();
        debug!(target: "fronius.bus", subscriber = id, "subscriber_registered");
        Subscription {
            id,
            queue,
            bus: Arc::downgrade(self),
        }
    }

    /// 关闭所有订阅队列（进程退出路径）。
    pub fn close_all(&self) {
        let queues: Vec<Arc<SubscriberQueue>> =
            lock(&self.subscribers).values().cloned().collect();
        for queue in queues {
            queue.close();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    fn unsubscribe(&self, id: u64) {
        if lock(&self.subscribers).remove(&id).is_some() {
            fronius_telemetry::record_subscriber_disconnected();
            debug!(target: "fronius.bus", subscriber = id, "subscriber_removed");
        }
    }
}

/// 一个订阅。丢弃即注销，队列里未投递的事件一并废弃。
pub struct Subscription {
    id: u64,
    queue: Arc<SubscriberQueue>,
    bus: Weak<EventBus>,
}

impl Subscription {
    /// 等待下一个事件；队列关闭且排空后返回 None。
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            if let Some(event) = self.queue.pop() {
                return Some(event);
            }
            if self.queue.closed.load(Ordering::Acquire) {
                return None;
            }
            self.queue.notify.notified().await;
        }
    }

    /// 非阻塞取一个事件。
    pub fn try_recv(&mut self) -> Option<Event> {
        self.queue.pop()
    }

    /// 本订阅因队列满被丢弃的事件数。
    pub fn dropped(&self) -> u64 {
        self.queue.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.queue.close();
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.id);
        }
    }
}

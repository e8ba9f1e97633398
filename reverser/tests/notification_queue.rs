use reverser::notification_queue::NotificationQueueArc;
use reverser::Handle;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Spawn a task that registers on `handle` and waits; returns once registered
async fn spawn_waiter(queue: &NotificationQueueArc, handle: Handle) -> JoinHandle<()> {
    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
    let queue = queue.clone();
    let waiter = tokio::spawn(async move {
        let wakeup = queue.wait_async(handle, "reader", queue.get_lock());
        ready_tx.send(()).unwrap();
        wakeup.await;
    });
    ready_rx.await.unwrap();
    waiter
}

#[tokio::test]
async fn test_notify_wakes_every_waiter() {
    let queue = NotificationQueueArc::new();
    let handle = Handle::new(1);
    queue.whitelist(handle, "session");

    let mut waiters = Vec::new();
    for _ in 0..3 {
        waiters.push(spawn_waiter(&queue, handle).await);
    }
    assert_eq!(queue.waiter_count(handle), 3);

    queue.notify(handle, 5);
    for waiter in waiters {
        timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }
    assert_eq!(queue.waiter_count(handle), 0);
}

#[tokio::test]
async fn test_unlist_wakes_waiters_and_later_waits() {
    let queue = NotificationQueueArc::new();
    let handle = Handle::new(2);
    queue.whitelist(handle, "session");

    let waiter = spawn_waiter(&queue, handle).await;
    queue.unlist(handle);
    timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    assert!(!queue.is_whitelisted(handle));

    // A reader that decides to wait after close must not hang
    let wakeup = queue.wait_async(handle, "late reader", queue.get_lock());
    timeout(Duration::from_secs(1), wakeup).await.unwrap();
    assert_eq!(queue.waiter_count(handle), 0);
}

#[tokio::test]
async fn test_waiter_registers_before_first_poll() {
    let queue = NotificationQueueArc::new();
    let handle = Handle::new(3);
    queue.whitelist(handle, "session");

    let wakeup = queue.wait_async(handle, "reader", queue.get_lock());
    assert_eq!(queue.waiter_count(handle), 1);

    // Notified between registration and the first poll
    queue.notify(handle, 1);
    timeout(Duration::from_secs(1), wakeup).await.unwrap();
}

#[tokio::test]
async fn test_remove_dropped_forgets_cancelled_waits() {
    let queue = NotificationQueueArc::new();
    let handle = Handle::new(4);
    queue.whitelist(handle, "session");

    let live = spawn_waiter(&queue, handle).await;
    for _ in 0..5 {
        let wakeup = queue.wait_async(handle, "cancelled", queue.get_lock());
        drop(wakeup);
    }
    assert_eq!(queue.waiter_count(handle), 6);

    queue.remove_dropped(handle);
    assert_eq!(queue.waiter_count(handle), 1);

    queue.notify(handle, 1);
    timeout(Duration::from_secs(1), live).await.unwrap().unwrap();

    // Nothing left to remove
    queue.remove_dropped(handle);
    assert_eq!(queue.waiter_count(handle), 0);
}

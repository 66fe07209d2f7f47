//! Concurrency behavior tests for the pool: FIFO fairness, saturation,
//! timeouts, and shutdown, exercised with plain threads and an in-memory
//! connector.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tinysql_core::error::{Error, PoolErrorKind};
use tinysql_pool::{Connect, Pool, PoolConfig, PooledLink};

struct MemConn {
    #[allow(dead_code)]
    id: usize,
    broken: bool,
}

impl PooledLink for MemConn {
    fn is_broken(&self) -> bool {
        self.broken
    }

    fn close(&mut self) {}
}

struct MemConnector {
    opened: AtomicUsize,
}

impl MemConnector {
    fn new() -> Self {
        Self {
            opened: AtomicUsize::new(0),
        }
    }
}

impl Connect for MemConnector {
    type Conn = MemConn;

    fn connect(&self) -> tinysql_core::Result<MemConn> {
        let id = self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemConn { id, broken: false })
    }
}

fn pool_kind(err: &Error) -> PoolErrorKind {
    match err {
        Error::Pool(p) => p.kind,
        other => panic!("expected pool error, got {other}"),
    }
}

#[test]
fn acquire_blocks_until_release() {
    let pool = Pool::new(MemConnector::new(), PoolConfig::new(1));
    let held = pool.acquire().unwrap();

    let waiter_pool = pool.clone();
    let (started_tx, started_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        started_tx.send(()).unwrap();
        let begin = Instant::now();
        let conn = waiter_pool.acquire_timeout(Some(Duration::from_secs(5))).unwrap();
        drop(conn);
        begin.elapsed()
    });

    started_rx.recv().unwrap();
    thread::sleep(Duration::from_millis(100));
    drop(held);

    let waited = handle.join().unwrap();
    assert!(waited >= Duration::from_millis(50), "waiter returned too early");
}

#[test]
fn release_unblocks_earliest_waiter_first() {
    let pool = Pool::new(MemConnector::new(), PoolConfig::new(1));
    let held = pool.acquire().unwrap();

    let (order_tx, order_rx) = mpsc::channel();
    let mut handles = Vec::new();
    for i in 0..3 {
        let pool = pool.clone();
        let order_tx = order_tx.clone();
        handles.push(thread::spawn(move || {
            let conn = pool.acquire_timeout(Some(Duration::from_secs(5))).unwrap();
            order_tx.send(i).unwrap();
            // Hold briefly so the next waiter observably runs after us.
            thread::sleep(Duration::from_millis(20));
            drop(conn);
        }));
        // Enqueue in a deterministic order.
        thread::sleep(Duration::from_millis(100));
    }
    drop(order_tx);

    drop(held);
    let order: Vec<usize> = order_rx.iter().collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(order, vec![0, 1, 2], "handoff order was not FIFO");
}

#[test]
fn saturated_pool_fails_fast_when_waiting_disabled() {
    let pool = Pool::new(
        MemConnector::new(),
        PoolConfig::new(1).wait_for_available(false),
    );
    let held = pool.acquire().unwrap();

    let begin = Instant::now();
    let err = pool.acquire().unwrap_err();
    assert_eq!(pool_kind(&err), PoolErrorKind::Saturated);
    assert!(begin.elapsed() < Duration::from_millis(100), "fail-fast blocked");
    drop(held);
}

#[test]
fn queue_cap_rejects_excess_waiters() {
    let pool = Pool::new(MemConnector::new(), PoolConfig::new(1).max_queue(1));
    let held = pool.acquire().unwrap();

    let queued_pool = pool.clone();
    let queued = thread::spawn(move || {
        queued_pool
            .acquire_timeout(Some(Duration::from_secs(5)))
            .map(drop)
    });
    thread::sleep(Duration::from_millis(100));

    // Queue slot is taken; the second waiter is turned away.
    let err = pool.acquire_timeout(Some(Duration::from_secs(5))).unwrap_err();
    assert_eq!(pool_kind(&err), PoolErrorKind::Saturated);

    drop(held);
    queued.join().unwrap().unwrap();
}

#[test]
fn queued_acquire_times_out() {
    let pool = Pool::new(MemConnector::new(), PoolConfig::new(1));
    let held = pool.acquire().unwrap();

    let begin = Instant::now();
    let err = pool
        .acquire_timeout(Some(Duration::from_millis(100)))
        .unwrap_err();
    assert_eq!(pool_kind(&err), PoolErrorKind::Timeout);
    assert!(begin.elapsed() >= Duration::from_millis(100));

    // The timed-out ticket must not receive the connection later: the
    // release should leave it idle instead.
    drop(held);
    thread::sleep(Duration::from_millis(50));
    let stats = pool.stats();
    assert_eq!(stats.idle_connections, 1);
    assert_eq!(stats.pending_requests, 0);
}

#[test]
fn release_beats_timeout_on_the_same_ticket() {
    // A release that reaches the ticket first must win even when the
    // deadline is about to fire. Run several rounds to give the race a
    // chance to happen in both directions; either outcome is legal, but
    // the connection must never be lost.
    let pool = Pool::new(MemConnector::new(), PoolConfig::new(1));
    for _ in 0..20 {
        let held = pool.acquire().unwrap();
        let racer = pool.clone();
        let handle = thread::spawn(move || {
            racer.acquire_timeout(Some(Duration::from_millis(10))).map(drop)
        });
        thread::sleep(Duration::from_millis(10));
        drop(held);
        // Timeout or success are both fine; the pool must stay consistent.
        let _ = handle.join().unwrap();
        let conn = pool.acquire_timeout(Some(Duration::from_secs(1))).unwrap();
        drop(conn);
    }
    assert_eq!(pool.stats().total_connections, 1);
}

#[test]
fn concurrent_acquires_under_the_limit_all_succeed() {
    let pool = Pool::new(MemConnector::new(), PoolConfig::new(10));
    let mut handles = Vec::new();
    for _ in 0..5 {
        let pool = pool.clone();
        handles.push(thread::spawn(move || {
            let conn = pool.acquire_timeout(Some(Duration::from_secs(5))).unwrap();
            thread::sleep(Duration::from_millis(10));
            assert!(!conn.is_broken());
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    let stats = pool.stats();
    assert!(stats.total_connections <= 10);
    assert_eq!(stats.active_connections, 0);
}

#[test]
fn shutdown_fails_queued_waiters() {
    let pool = Pool::new(MemConnector::new(), PoolConfig::new(1));
    let held = pool.acquire().unwrap();

    let queued_pool = pool.clone();
    let queued = thread::spawn(move || {
        queued_pool
            .acquire_timeout(Some(Duration::from_secs(5)))
            .map(drop)
    });
    thread::sleep(Duration::from_millis(100));

    pool.close();
    let err = queued.join().unwrap().unwrap_err();
    assert_eq!(pool_kind(&err), PoolErrorKind::Closed);

    // The in-use connection is closed on release rather than interrupted.
    drop(held);
    assert_eq!(pool.stats().total_connections, 0);
}

#[test]
fn retrying_waiter_keeps_its_queue_position() {
    let pool = Pool::new(MemConnector::new(), PoolConfig::new(1));
    let mut held = pool.acquire().unwrap();

    let (order_tx, order_rx) = mpsc::channel();
    let mut handles = Vec::new();
    for i in 0..2 {
        let pool = pool.clone();
        let order_tx = order_tx.clone();
        handles.push(thread::spawn(move || {
            let conn = pool.acquire_timeout(Some(Duration::from_secs(5))).unwrap();
            order_tx.send(i).unwrap();
            thread::sleep(Duration::from_millis(20));
            drop(conn);
        }));
        // Enqueue in a deterministic order.
        thread::sleep(Duration::from_millis(100));
    }
    drop(order_tx);

    // A third caller races for the slot the discard is about to free. An
    // already-expired deadline never queues: it takes a free slot or
    // fails, so the spinning thief usually beats the woken waiter to the
    // slot and forces it to queue again.
    let thief_pool = pool.clone();
    let (stole_tx, stole_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let thief = thread::spawn(move || {
        let conn = loop {
            match thief_pool.acquire_timeout(Some(Duration::ZERO)) {
                Ok(conn) => break conn,
                Err(_) => thread::yield_now(),
            }
        };
        stole_tx.send(()).unwrap();
        release_rx.recv().unwrap();
        drop(conn);
    });

    held.broken = true;
    drop(held);
    stole_rx.recv().unwrap();

    // Give the displaced waiter time to re-enter the queue, then hand the
    // slot back. The earliest waiter must still come out first.
    thread::sleep(Duration::from_millis(200));
    release_tx.send(()).unwrap();

    let order: Vec<usize> = order_rx.iter().collect();
    for handle in handles {
        handle.join().unwrap();
    }
    thief.join().unwrap();
    assert_eq!(order, vec![0, 1], "displaced waiter lost its place");
}

#[test]
fn stats_report_in_flight_opens_separately() {
    // A connector that parks inside the handshake until released.
    struct GateConnector {
        gate: std::sync::Mutex<mpsc::Receiver<()>>,
    }

    impl Connect for GateConnector {
        type Conn = MemConn;

        fn connect(&self) -> tinysql_core::Result<MemConn> {
            self.gate.lock().unwrap().recv().ok();
            Ok(MemConn {
                id: 0,
                broken: false,
            })
        }
    }

    let (gate_tx, gate_rx) = mpsc::channel();
    let pool = Pool::new(
        GateConnector {
            gate: std::sync::Mutex::new(gate_rx),
        },
        PoolConfig::new(1),
    );

    let opener_pool = pool.clone();
    let opener = thread::spawn(move || {
        let conn = opener_pool
            .acquire_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        thread::sleep(Duration::from_millis(200));
        drop(conn);
    });

    // While the handshake runs, the slot is reserved but not yet an open
    // connection.
    let begin = Instant::now();
    while pool.stats().connecting_connections == 0 {
        assert!(
            begin.elapsed() < Duration::from_secs(2),
            "opener never reached the handshake"
        );
        thread::sleep(Duration::from_millis(5));
    }
    let stats = pool.stats();
    assert_eq!(stats.connecting_connections, 1);
    assert_eq!(stats.total_connections, 0);
    assert_eq!(stats.active_connections, 0);

    gate_tx.send(()).unwrap();
    let begin = Instant::now();
    while pool.stats().connecting_connections != 0 {
        assert!(
            begin.elapsed() < Duration::from_secs(2),
            "handshake never completed"
        );
        thread::sleep(Duration::from_millis(5));
    }
    let stats = pool.stats();
    assert_eq!(stats.total_connections, 1);
    assert_eq!(stats.active_connections, 1);

    opener.join().unwrap();
    assert_eq!(pool.stats().idle_connections, 1);
}

#[test]
fn broken_release_wakes_a_waiter_for_replacement() {
    let pool = Pool::new(MemConnector::new(), PoolConfig::new(1));
    let mut held = pool.acquire().unwrap();

    let waiter_pool = pool.clone();
    let waiter = thread::spawn(move || {
        waiter_pool
            .acquire_timeout(Some(Duration::from_secs(5)))
            .map(|conn| {
                let broken = conn.is_broken();
                drop(conn);
                broken
            })
    });
    thread::sleep(Duration::from_millis(100));

    held.broken = true;
    drop(held);

    // The waiter gets a freshly opened connection, not the broken one.
    let got_broken = waiter.join().unwrap().unwrap();
    assert!(!got_broken);
}

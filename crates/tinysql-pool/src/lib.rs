//! Bounded connection pool with FIFO waiters.
//!
//! The pool keeps at most `max_connections` connections open. An acquire
//! hands out an idle connection when one exists, opens a new one while
//! under the limit, and otherwise queues the caller on a first-in
//! first-out wait list. A release hands the connection directly to the
//! oldest live waiter, skipping the idle list entirely.
//!
//! All bookkeeping (status transitions, queue insert/remove) happens under
//! one mutex that is never held across connection I/O, so queries on
//! different connections proceed fully in parallel.
//!
//! Timeouts and releases may race on the same wait ticket; the first one
//! to flip the ticket's state wins. A ticket that timed out is skipped at
//! handoff time, so a connection is never delivered twice and never
//! delivered to a caller that already gave up.

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use tinysql_core::Result;
use tinysql_core::error::{Error, PoolError, PoolErrorKind};

/// A connection the pool can manage.
pub trait PooledLink {
    /// Has this connection hit a fatal transport or protocol error?
    /// Broken connections are discarded on release instead of reused.
    fn is_broken(&self) -> bool;

    /// Close the connection. Best effort; errors are swallowed.
    fn close(&mut self);
}

/// Opens new pool connections, running whatever handshake the backend needs.
pub trait Connect: Send + Sync + 'static {
    type Conn: PooledLink + Send + 'static;

    fn connect(&self) -> Result<Self::Conn>;
}

/// Connection pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Upper bound on concurrently open connections
    pub max_connections: usize,
    /// Upper bound on simultaneously waiting acquire calls (0 = unbounded)
    pub max_queue: usize,
    /// If false, acquire fails immediately when saturated instead of queueing
    pub wait_for_available: bool,
    /// Default deadline for queued acquires (None = wait forever)
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            max_queue: 0,
            wait_for_available: true,
            acquire_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl PoolConfig {
    /// Create a configuration with the given connection limit.
    pub fn new(max_connections: usize) -> Self {
        Self {
            max_connections,
            ..Default::default()
        }
    }

    /// Set the wait-queue cap (0 = unbounded).
    pub fn max_queue(mut self, n: usize) -> Self {
        self.max_queue = n;
        self
    }

    /// Enable or disable queueing when the pool is saturated.
    pub fn wait_for_available(mut self, wait: bool) -> Self {
        self.wait_for_available = wait;
        self
    }

    /// Set the default acquire deadline.
    pub fn acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Pool statistics snapshot.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Connections whose handshake has completed, idle and in use
    pub total_connections: usize,
    /// Connections sitting idle in the pool
    pub idle_connections: usize,
    /// Connections currently handed out
    pub active_connections: usize,
    /// Slots reserved for connections whose handshake is still running.
    /// These count against the connection limit but are not open yet.
    pub connecting_connections: usize,
    /// Acquire calls parked on the wait queue
    pub pending_requests: usize,
}

/// One queued acquire. The state advances exactly once past `Waiting`;
/// whoever flips it first (release, shutdown, or the waiter's own timeout)
/// decides the outcome.
enum WaitState<T> {
    Waiting,
    /// A released connection was handed directly to this ticket
    Ready(T),
    /// Capacity was freed; the waiter should retry from the top
    Retry,
    /// The waiter timed out and left; skip this ticket at handoff
    Abandoned,
    /// The pool shut down while the ticket was queued
    Closed,
}

struct Waiter<T> {
    state: Mutex<WaitState<T>>,
    cv: Condvar,
}

enum HandOff<T> {
    Conn(T),
    Retry,
    TimedOut,
    Closed,
}

impl<T> Waiter<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(WaitState::Waiting),
            cv: Condvar::new(),
        }
    }

    /// Park until the ticket resolves or the deadline passes. A handoff
    /// that lands before the timeout is observed still wins.
    fn wait(&self, deadline: Option<Instant>) -> HandOff<T> {
        let mut state = self.state.lock();
        loop {
            match mem::replace(&mut *state, WaitState::Waiting) {
                WaitState::Ready(conn) => return HandOff::Conn(conn),
                WaitState::Retry => return HandOff::Retry,
                WaitState::Closed => return HandOff::Closed,
                WaitState::Waiting | WaitState::Abandoned => {}
            }
            if let Some(deadline) = deadline {
                if self.cv.wait_until(&mut state, deadline).timed_out() {
                    return match mem::replace(&mut *state, WaitState::Abandoned) {
                        WaitState::Ready(conn) => HandOff::Conn(conn),
                        WaitState::Retry => HandOff::Retry,
                        WaitState::Closed => HandOff::Closed,
                        WaitState::Waiting | WaitState::Abandoned => HandOff::TimedOut,
                    };
                }
            } else {
                self.cv.wait(&mut state);
            }
        }
    }
}

struct Inner<T> {
    idle: Vec<T>,
    /// Slots in use: open connections plus handshakes in flight
    open: usize,
    /// Slots whose handshake has not finished yet (included in `open`)
    connecting: usize,
    waiters: VecDeque<Arc<Waiter<T>>>,
    closed: bool,
}

struct Shared<C: Connect> {
    connector: C,
    config: PoolConfig,
    inner: Mutex<Inner<C::Conn>>,
}

/// A bounded connection pool.
///
/// Cloning the pool is cheap; clones share the same connections.
pub struct Pool<C: Connect> {
    shared: Arc<Shared<C>>,
}

impl<C: Connect> Clone for Pool<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: Connect> Pool<C> {
    /// Create a new pool. Connections are opened lazily on first acquire.
    pub fn new(connector: C, config: PoolConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                connector,
                config,
                inner: Mutex::new(Inner {
                    idle: Vec::new(),
                    open: 0,
                    connecting: 0,
                    waiters: VecDeque::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// Get the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Acquire a connection using the configured default deadline.
    pub fn acquire(&self) -> Result<PooledConnection<C>> {
        self.acquire_timeout(self.shared.config.acquire_timeout)
    }

    /// Acquire a connection, waiting at most `timeout` when queued
    /// (None = wait forever).
    pub fn acquire_timeout(&self, timeout: Option<Duration>) -> Result<PooledConnection<C>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut requeue = false;
        loop {
            let waiter = {
                let mut inner = self.shared.inner.lock();
                if inner.closed {
                    return Err(pool_err(PoolErrorKind::Closed, "pool is closed"));
                }
                if let Some(conn) = inner.idle.pop() {
                    tracing::trace!("acquire: reusing idle connection");
                    return Ok(self.guard(conn));
                }
                if inner.open < self.shared.config.max_connections {
                    inner.open += 1;
                    inner.connecting += 1;
                    drop(inner);
                    return self.open_connection();
                }
                if !self.shared.config.wait_for_available {
                    return Err(pool_err(
                        PoolErrorKind::Saturated,
                        "pool saturated and waiting is disabled",
                    ));
                }
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        return Err(pool_err(PoolErrorKind::Timeout, "acquire timed out"));
                    }
                }
                scrub_abandoned(&mut inner.waiters);
                // A retrying caller already held a queue slot, so the cap
                // does not apply to it again.
                if !requeue
                    && self.shared.config.max_queue != 0
                    && inner.waiters.len() >= self.shared.config.max_queue
                {
                    return Err(pool_err(PoolErrorKind::Saturated, "acquire queue is full"));
                }
                let waiter = Arc::new(Waiter::new());
                if requeue {
                    // This caller was the oldest waiter when it was woken
                    // to retry; if the freed slot was snatched meanwhile it
                    // keeps its place instead of lining up behind newer
                    // callers.
                    inner.waiters.push_front(Arc::clone(&waiter));
                } else {
                    inner.waiters.push_back(Arc::clone(&waiter));
                }
                waiter
            };

            match waiter.wait(deadline) {
                HandOff::Conn(conn) => {
                    tracing::trace!("acquire: connection handed off from release");
                    return Ok(self.guard(conn));
                }
                // Capacity freed up; go back and try to open or grab idle.
                HandOff::Retry => requeue = true,
                HandOff::TimedOut => {
                    return Err(pool_err(PoolErrorKind::Timeout, "acquire timed out"));
                }
                HandOff::Closed => {
                    return Err(pool_err(PoolErrorKind::Closed, "pool is closed"));
                }
            }
        }
    }

    /// Current pool statistics.
    pub fn stats(&self) -> PoolStats {
        let inner = self.shared.inner.lock();
        let pending = inner
            .waiters
            .iter()
            .filter(|w| matches!(*w.state.lock(), WaitState::Waiting))
            .count();
        PoolStats {
            total_connections: inner.open - inner.connecting,
            idle_connections: inner.idle.len(),
            active_connections: inner.open - inner.connecting - inner.idle.len(),
            connecting_connections: inner.connecting,
            pending_requests: pending,
        }
    }

    /// Has the pool been shut down?
    pub fn is_closed(&self) -> bool {
        self.shared.inner.lock().closed
    }

    /// Shut the pool down: close all idle connections, fail queued
    /// waiters, and reject further acquires. Connections currently in use
    /// are closed as they are released; in-flight work is not interrupted.
    pub fn close(&self) {
        let (idle, waiters) = {
            let mut inner = self.shared.inner.lock();
            if inner.closed {
                return;
            }
            inner.closed = true;
            let idle = mem::take(&mut inner.idle);
            inner.open -= idle.len();
            (idle, mem::take(&mut inner.waiters))
        };
        tracing::debug!(idle = idle.len(), queued = waiters.len(), "pool shutdown");
        for waiter in waiters {
            let mut state = waiter.state.lock();
            if matches!(*state, WaitState::Waiting) {
                *state = WaitState::Closed;
                waiter.cv.notify_one();
            }
        }
        for mut conn in idle {
            conn.close();
        }
    }

    fn guard(&self, conn: C::Conn) -> PooledConnection<C> {
        PooledConnection {
            shared: Arc::clone(&self.shared),
            conn: Some(conn),
        }
    }

    /// Open a new connection. The slot was already reserved under the
    /// lock; it is rolled back if the handshake fails.
    fn open_connection(&self) -> Result<PooledConnection<C>> {
        let result = self.shared.connector.connect();
        let mut inner = self.shared.inner.lock();
        inner.connecting -= 1;
        match result {
            Ok(conn) => {
                drop(inner);
                tracing::debug!("pool opened a new connection");
                Ok(self.guard(conn))
            }
            Err(e) => {
                inner.open -= 1;
                // The slot we reserved is free again; an existing waiter
                // may claim it before any new acquire does.
                wake_retry(&mut inner.waiters);
                Err(e)
            }
        }
    }
}

impl<C: Connect> Shared<C> {
    /// Return a connection to the pool. Broken connections are discarded
    /// and their slot is offered to the oldest waiter.
    fn release(&self, mut conn: C::Conn) {
        let mut inner = self.inner.lock();
        if inner.closed {
            inner.open -= 1;
            drop(inner);
            conn.close();
            return;
        }
        if conn.is_broken() {
            inner.open -= 1;
            tracing::debug!("discarding broken connection on release");
            wake_retry(&mut inner.waiters);
            drop(inner);
            conn.close();
            return;
        }
        // Hand the connection straight to the oldest live ticket, skipping
        // tickets whose callers already timed out.
        while let Some(waiter) = inner.waiters.pop_front() {
            let mut state = waiter.state.lock();
            if matches!(*state, WaitState::Waiting) {
                *state = WaitState::Ready(conn);
                waiter.cv.notify_one();
                return;
            }
        }
        inner.idle.push(conn);
    }
}

/// Wake the oldest live waiter so it can retry acquiring (used when a
/// connection slot frees up without a connection to hand over).
fn wake_retry<T>(waiters: &mut VecDeque<Arc<Waiter<T>>>) {
    while let Some(waiter) = waiters.pop_front() {
        let mut state = waiter.state.lock();
        if matches!(*state, WaitState::Waiting) {
            *state = WaitState::Retry;
            waiter.cv.notify_one();
            return;
        }
    }
}

/// Drop abandoned tickets so they do not count against the queue cap.
fn scrub_abandoned<T>(waiters: &mut VecDeque<Arc<Waiter<T>>>) {
    waiters.retain(|w| !matches!(*w.state.lock(), WaitState::Abandoned));
}

fn pool_err(kind: PoolErrorKind, message: &str) -> Error {
    Error::Pool(PoolError {
        kind,
        message: message.to_string(),
    })
}

/// A connection borrowed from the pool.
///
/// Dropping the guard returns the connection; broken connections are
/// discarded instead. The caller must not retain the inner connection
/// past the guard's lifetime (the API makes that impossible without
/// `mem::forget`).
pub struct PooledConnection<C: Connect> {
    shared: Arc<Shared<C>>,
    conn: Option<C::Conn>,
}

impl<C: Connect> PooledConnection<C> {
    /// Discard this connection instead of returning it to the pool.
    pub fn discard(mut self) {
        if let Some(mut conn) = self.conn.take() {
            let mut inner = self.shared.inner.lock();
            inner.open -= 1;
            wake_retry(&mut inner.waiters);
            drop(inner);
            conn.close();
        }
    }
}

impl<C: Connect> std::fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection").finish_non_exhaustive()
    }
}

impl<C: Connect> std::ops::Deref for PooledConnection<C> {
    type Target = C::Conn;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection already released")
    }
}

impl<C: Connect> std::ops::DerefMut for PooledConnection<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection already released")
    }
}

impl<C: Connect> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.shared.release(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestConn {
        broken: bool,
        closed: bool,
    }

    impl PooledLink for TestConn {
        fn is_broken(&self) -> bool {
            self.broken
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    struct TestConnector;

    impl Connect for TestConnector {
        type Conn = TestConn;

        fn connect(&self) -> Result<TestConn> {
            Ok(TestConn {
                broken: false,
                closed: false,
            })
        }
    }

    #[test]
    fn config_builder() {
        let config = PoolConfig::new(4)
            .max_queue(2)
            .wait_for_available(false)
            .acquire_timeout(Some(Duration::from_millis(250)));
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.max_queue, 2);
        assert!(!config.wait_for_available);
        assert_eq!(config.acquire_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn idle_reuse_keeps_open_count() {
        let pool = Pool::new(TestConnector, PoolConfig::new(2));
        let first = pool.acquire().unwrap();
        drop(first);
        let stats = pool.stats();
        assert_eq!(stats.total_connections, 1);
        assert_eq!(stats.idle_connections, 1);

        let second = pool.acquire().unwrap();
        assert_eq!(pool.stats().total_connections, 1);
        drop(second);
    }

    #[test]
    fn broken_connection_is_discarded() {
        let pool = Pool::new(TestConnector, PoolConfig::new(1));
        let mut conn = pool.acquire().unwrap();
        conn.broken = true;
        drop(conn);
        let stats = pool.stats();
        assert_eq!(stats.total_connections, 0);
        assert_eq!(stats.idle_connections, 0);

        // The slot is free; the next acquire opens a replacement.
        let replacement = pool.acquire().unwrap();
        assert!(!replacement.is_broken());
    }

    #[test]
    fn closed_pool_rejects_acquire() {
        let pool = Pool::new(TestConnector, PoolConfig::new(1));
        pool.close();
        let err = pool.acquire().unwrap_err();
        match err {
            Error::Pool(p) => assert_eq!(p.kind, PoolErrorKind::Closed),
            other => panic!("expected pool error, got {other}"),
        }
        assert!(pool.is_closed());
    }

    #[test]
    fn discard_frees_the_slot() {
        let pool = Pool::new(TestConnector, PoolConfig::new(1));
        let conn = pool.acquire().unwrap();
        conn.discard();
        assert_eq!(pool.stats().total_connections, 0);
        assert!(pool.acquire().is_ok());
    }
}

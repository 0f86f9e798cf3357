use async_trait::async_trait;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, AtomicU8, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type LcResult<T = ()> = std::result::Result<T, LifecycleError>;
type TaskResult<T = ()> = anyhow::Result<T>;

// ----- Status model ----------------------------------------------------------

/// State of a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl Status {
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn from_u8(x: u8) -> Self {
        match x {
            1 => Status::Starting,
            2 => Status::Running,
            3 => Status::Stopping,
            _ => Status::Stopped,
        }
    }
}

/// How a job ended after `stop()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Finished,
    Cancelled,
    Timeout,
}

/// Flips `Starting -> Running` once the job says it is ready (e.g. the socket is bound).
pub struct ReadySignal(oneshot::Sender<()>);

impl ReadySignal {
    #[inline]
    pub fn notify(self) {
        let _ = self.0.send(());
    }
}

/// A long-running job owned by a module. It must return once `cancel` fires.
#[async_trait]
pub trait Runnable: Send + Sync + 'static {
    async fn run(self: Arc<Self>, cancel: CancellationToken) -> TaskResult<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("already started")]
    AlreadyStarted,
}

// ----- Lifecycle -------------------------------------------------------------

/// Start/stop controller for a single background task.
pub struct Lifecycle {
    status: Arc<AtomicU8>,
    handle: Mutex<Option<JoinHandle<()>>>,
    cancel: Mutex<Option<CancellationToken>>,
    finished: Arc<AtomicBool>,
    was_cancelled: Arc<AtomicBool>,
    finished_notify: Arc<Notify>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            status: Arc::new(AtomicU8::new(Status::Stopped.as_u8())),
            handle: Mutex::new(None),
            cancel: Mutex::new(None),
            finished: Arc::new(AtomicBool::new(false)),
            was_cancelled: Arc::new(AtomicBool::new(false)),
            finished_notify: Arc::new(Notify::new()),
        }
    }

    #[inline]
    fn store_status(&self, s: Status) {
        self.status.store(s.as_u8(), Ordering::Release);
    }

    /// Spawn `make(cancel)`; the status is `Running` right away.
    pub fn start_with_token<F, Fut>(&self, token: CancellationToken, make: F) -> LcResult
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult<()>> + Send + 'static,
    {
        self.start_core(token, false, move |tok, _ready| make(tok))
    }

    /// Spawn `make(cancel, ready)`; the status stays `Starting` until `ready.notify()`.
    pub fn start_with_ready_and_token<F, Fut>(&self, token: CancellationToken, make: F) -> LcResult
    where
        F: FnOnce(CancellationToken, ReadySignal) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult<()>> + Send + 'static,
    {
        self.start_core(token, true, make)
    }

    fn start_core<F, Fut>(&self, token: CancellationToken, ready_mode: bool, make: F) -> LcResult
    where
        F: FnOnce(CancellationToken, ReadySignal) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult<()>> + Send + 'static,
    {
        self.status
            .compare_exchange(
                Status::Stopped.as_u8(),
                Status::Starting.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| LifecycleError::AlreadyStarted)?;

        self.finished.store(false, Ordering::Release);
        self.was_cancelled.store(false, Ordering::Release);
        *self.cancel.lock() = Some(token.clone());

        let (ready_tx, ready_rx) = oneshot::channel::<()>();
        if ready_mode {
            let status_on_ready = self.status.clone();
            tokio::spawn(async move {
                if ready_rx.await.is_ok() {
                    let _ = status_on_ready.compare_exchange(
                        Status::Starting.as_u8(),
                        Status::Running.as_u8(),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    );
                    tracing::debug!("lifecycle status -> running (ready)");
                }
            });
        } else {
            self.store_status(Status::Running);
        }

        let finished_flag = self.finished.clone();
        let finished_notify = self.finished_notify.clone();
        let status_on_finish = self.status.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = make(token, ReadySignal(ready_tx)).await {
                tracing::error!(error = %e, "lifecycle task error");
            }
            finished_flag.store(true, Ordering::Release);
            finished_notify.notify_waiters();
            status_on_finish.store(Status::Stopped.as_u8(), Ordering::Release);
            tracing::debug!("lifecycle status -> stopped (finished)");
        });
        *self.handle.lock() = Some(handle);

        Ok(())
    }

    /// Cancel the task and wait up to `timeout`; the task is aborted on timeout.
    pub async fn stop(&self, timeout: Duration) -> LcResult<StopReason> {
        if self.status() == Status::Stopped {
            return Ok(StopReason::Finished);
        }
        self.store_status(Status::Stopping);

        if let Some(tok) = { self.cancel.lock().take() } {
            self.was_cancelled.store(true, Ordering::Release);
            tok.cancel();
        }

        let finished_flag = self.finished.clone();
        let notify = self.finished_notify.clone();
        let finished_wait = async move {
            let notified = notify.notified();
            if !finished_flag.load(Ordering::Acquire) {
                notified.await;
            }
        };

        let reason = tokio::select! {
            _ = finished_wait => {
                if self.was_cancelled.load(Ordering::Acquire) {
                    StopReason::Cancelled
                } else {
                    StopReason::Finished
                }
            }
            _ = tokio::time::sleep(timeout) => StopReason::Timeout,
        };

        let handle_opt = { self.handle.lock().take() };
        if let Some(handle) = handle_opt {
            if reason == StopReason::Timeout && !handle.is_finished() {
                tracing::warn!("lifecycle stop timed out; aborting task");
                handle.abort();
            }
            match handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => tracing::debug!("task aborted"),
                Err(e) => tracing::warn!(error = %e, "task join error"),
            }
            self.finished.store(true, Ordering::Release);
            self.finished_notify.notify_waiters();
        }

        self.store_status(Status::Stopped);
        tracing::info!(?reason, "lifecycle stopped");
        Ok(reason)
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self.status(), Status::Starting | Status::Running)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if let Some(tok) = self.cancel.get_mut().take() {
            tok.cancel();
        }
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}

// ----- WithLifecycle wrapper -------------------------------------------------

/// Implements [`StatefulModule`](crate::contracts::StatefulModule) for any [`Runnable`].
pub struct WithLifecycle<T: Runnable> {
    inner: Arc<T>,
    lc: Lifecycle,
    stop_timeout: Duration,
}

impl<T: Runnable> WithLifecycle<T> {
    pub fn new(inner: T) -> Self {
        Self::from_arc(Arc::new(inner))
    }

    pub fn from_arc(inner: Arc<T>) -> Self {
        Self {
            inner,
            lc: Lifecycle::new(),
            stop_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_stop_timeout(mut self, d: Duration) -> Self {
        self.stop_timeout = d;
        self
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.lc.status()
    }

    #[inline]
    pub fn inner(&self) -> &T {
        self.inner.as_ref()
    }
}

#[async_trait]
impl<T: Runnable> crate::contracts::StatefulModule for WithLifecycle<T> {
    async fn start(&self, external_cancel: CancellationToken) -> TaskResult<()> {
        let inner = self.inner.clone();
        self.lc
            .start_with_token(external_cancel.child_token(), move |cancel| inner.run(cancel))
            .map_err(anyhow::Error::from)
    }

    async fn stop(&self, external_cancel: CancellationToken) -> TaskResult<()> {
        tokio::select! {
            res = self.lc.stop(self.stop_timeout) => {
                res?;
            }
            _ = external_cancel.cancelled() => {
                self.lc.stop(Duration::from_millis(0)).await?;
            }
        }
        Ok(())
    }
}

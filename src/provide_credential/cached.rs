use std::fmt;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use log::{debug, error};

use crate::provide_credential::ProvideCredential;
use crate::scheduler::{ScheduleHandle, ScheduleRefresh};
use crate::{Credential, Result};

#[derive(Default)]
struct CacheState {
    cached: Option<Credential>,
    refresh: Option<ScheduleHandle>,
    stopped: bool,
}

/// CachedCredentialProvider caches the inner provider's credential and,
/// when the credential carries a TTL, schedules a background refresh for
/// when it expires.
///
/// A failed refresh clears the cache and schedules no retry; the next
/// load reaches the inner provider again. After [`stop`][ProvideCredential::stop]
/// the last cached credential keeps being served until
/// [`invalidate`][Self::invalidate] drops it.
pub struct CachedCredentialProvider {
    inner: Arc<dyn ProvideCredential>,
    scheduler: Arc<dyn ScheduleRefresh>,
    state: Arc<Mutex<CacheState>>,
}

impl Debug for CachedCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().expect("lock poisoned");
        f.debug_struct("CachedCredentialProvider")
            .field("inner", &self.inner)
            .field("cached", &state.cached.is_some())
            .field("stopped", &state.stopped)
            .finish()
    }
}

impl CachedCredentialProvider {
    /// Wrap `inner`, running TTL-driven refreshes on `scheduler`.
    pub fn new(inner: impl ProvideCredential, scheduler: Arc<dyn ScheduleRefresh>) -> Self {
        Self {
            inner: Arc::new(inner),
            scheduler,
            state: Arc::default(),
        }
    }

    /// Drop the cached credential and cancel any scheduled refresh.
    pub fn invalidate(&self) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.cached = None;
        if let Some(refresh) = state.refresh.take() {
            refresh.cancel();
        }
    }
}

impl ProvideCredential for CachedCredentialProvider {
    fn provide_credential(&self) -> Result<Option<Credential>> {
        // One lock over lookup, load and scheduling, so racing callers
        // cannot double-load or double-schedule.
        let mut state = self.state.lock().expect("lock poisoned");

        if let Some(cred) = &state.cached {
            return Ok(Some(cred.clone()));
        }

        let cred = self.inner.provide_credential()?;
        if let Some(cred) = &cred {
            store_and_schedule(
                &mut state,
                &self.inner,
                &self.scheduler,
                &self.state,
                cred.clone(),
            );
        }

        Ok(cred)
    }

    fn stop(&self) {
        {
            let mut state = self.state.lock().expect("lock poisoned");
            state.stopped = true;
            if let Some(refresh) = state.refresh.take() {
                refresh.cancel();
            }
        }

        self.inner.stop();
    }
}

fn store_and_schedule(
    state: &mut CacheState,
    inner: &Arc<dyn ProvideCredential>,
    scheduler: &Arc<dyn ScheduleRefresh>,
    shared: &Arc<Mutex<CacheState>>,
    cred: Credential,
) {
    if let Some(refresh) = state.refresh.take() {
        refresh.cancel();
    }

    let ttl = cred.ttl;
    state.cached = Some(cred);

    if state.stopped {
        return;
    }

    if let Some(ttl) = ttl {
        let task = {
            let inner = Arc::clone(inner);
            let scheduler = Arc::clone(scheduler);
            let shared = Arc::clone(shared);
            Box::new(move || refresh_credential(inner, scheduler, shared))
        };
        state.refresh = Some(scheduler.schedule_refresh(ttl, task));
    }
}

fn refresh_credential(
    inner: Arc<dyn ProvideCredential>,
    scheduler: Arc<dyn ScheduleRefresh>,
    shared: Arc<Mutex<CacheState>>,
) {
    let mut state = shared.lock().expect("lock poisoned");
    if state.stopped {
        return;
    }

    match inner.provide_credential() {
        Ok(Some(cred)) => {
            debug!("credential refreshed in background");
            store_and_schedule(&mut state, &inner, &scheduler, &shared, cred);
        }
        Ok(None) => {
            error!("credential refresh found no credential, cache cleared");
            state.cached = None;
            state.refresh = None;
        }
        Err(err) => {
            error!("credential refresh failed, cache cleared: {err:?}");
            state.cached = None;
            state.refresh = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::scheduler::RefreshTask;
    use crate::Error;

    /// Scheduler that fires tasks only when the test says so.
    #[derive(Default)]
    struct ManualScheduler {
        tasks: Mutex<Vec<(Duration, RefreshTask, ScheduleHandle)>>,
    }

    impl Debug for ManualScheduler {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("ManualScheduler")
                .field("pending", &self.pending())
                .finish()
        }
    }

    impl ManualScheduler {
        fn pending(&self) -> usize {
            self.tasks.lock().expect("lock poisoned").len()
        }

        fn fire_all(&self) {
            let tasks = std::mem::take(&mut *self.tasks.lock().expect("lock poisoned"));
            for (_, task, handle) in tasks {
                if !handle.is_cancelled() {
                    task();
                }
            }
        }
    }

    impl ScheduleRefresh for ManualScheduler {
        fn schedule_refresh(&self, delay: Duration, task: RefreshTask) -> ScheduleHandle {
            let handle = ScheduleHandle::default();
            self.tasks
                .lock()
                .expect("lock poisoned")
                .push((delay, task, handle.clone()));
            handle
        }
    }

    #[derive(Debug, Default)]
    struct QueueProvider {
        calls: Arc<AtomicUsize>,
        stopped: Arc<AtomicBool>,
        results: Arc<Mutex<VecDeque<Result<Option<Credential>>>>>,
    }

    impl QueueProvider {
        fn new(results: impl IntoIterator<Item = Result<Option<Credential>>>) -> Self {
            Self {
                calls: Arc::default(),
                stopped: Arc::default(),
                results: Arc::new(Mutex::new(results.into_iter().collect())),
            }
        }
    }

    impl ProvideCredential for QueueProvider {
        fn provide_credential(&self) -> Result<Option<Credential>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .expect("lock poisoned")
                .pop_front()
                .unwrap_or(Ok(None))
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    fn with_ttl(access_key_id: &str, ttl: Duration) -> Credential {
        Credential::new(access_key_id, "secret_access_key").with_ttl(ttl)
    }

    #[test]
    fn test_cached_load_is_idempotent() {
        let _ = env_logger::builder().is_test(true).try_init();

        let scheduler = Arc::new(ManualScheduler::default());
        let provider = CachedCredentialProvider::new(
            QueueProvider::new([Ok(Some(Credential::new("test_key", "test_secret")))]),
            scheduler.clone(),
        );

        let first = provider
            .provide_credential()
            .expect("load must not fail")
            .expect("credential must be found");
        let second = provider
            .provide_credential()
            .expect("load must not fail")
            .expect("credential must be found");

        assert_eq!(first.access_key_id, second.access_key_id);
        assert_eq!(first.secret_access_key, second.secret_access_key);
        // No TTL, so nothing to refresh.
        assert_eq!(0, scheduler.pending());
    }

    #[test]
    fn test_cached_calls_inner_once() {
        let _ = env_logger::builder().is_test(true).try_init();

        let scheduler = Arc::new(ManualScheduler::default());
        let inner = QueueProvider::new([Ok(Some(with_ttl("test_key", Duration::from_secs(300))))]);
        let calls = inner.calls.clone();
        let provider = CachedCredentialProvider::new(inner, scheduler.clone());

        for _ in 0..3 {
            provider
                .provide_credential()
                .expect("load must not fail")
                .expect("credential must be found");
        }

        assert_eq!(1, calls.load(Ordering::SeqCst));
        // One refresh scheduled, not one per load.
        assert_eq!(1, scheduler.pending());
    }

    #[test]
    fn test_cached_refresh_replaces_credential() {
        let _ = env_logger::builder().is_test(true).try_init();

        let scheduler = Arc::new(ManualScheduler::default());
        let inner = QueueProvider::new([
            Ok(Some(with_ttl("old_key", Duration::from_secs(300)))),
            Ok(Some(with_ttl("new_key", Duration::from_secs(300)))),
        ]);
        let calls = inner.calls.clone();
        let provider = CachedCredentialProvider::new(inner, scheduler.clone());

        let cred = provider
            .provide_credential()
            .expect("load must not fail")
            .expect("credential must be found");
        assert_eq!("old_key", cred.access_key_id);

        scheduler.fire_all();

        let cred = provider
            .provide_credential()
            .expect("load must not fail")
            .expect("credential must be found");
        assert_eq!("new_key", cred.access_key_id);
        assert_eq!(2, calls.load(Ordering::SeqCst));
        // The refreshed credential has a TTL of its own.
        assert_eq!(1, scheduler.pending());
    }

    #[test]
    fn test_cached_refresh_failure_clears_cache() {
        let _ = env_logger::builder().is_test(true).try_init();

        let scheduler = Arc::new(ManualScheduler::default());
        let inner = QueueProvider::new([
            Ok(Some(with_ttl("test_key", Duration::from_secs(300)))),
            Err(Error::unexpected("refresh failed")),
        ]);
        let calls = inner.calls.clone();
        let provider = CachedCredentialProvider::new(inner, scheduler.clone());

        provider
            .provide_credential()
            .expect("load must not fail")
            .expect("credential must be found");

        scheduler.fire_all();

        // No retry was scheduled.
        assert_eq!(0, scheduler.pending());
        // The cache is empty, so the next load reaches the inner provider.
        assert!(provider
            .provide_credential()
            .expect("load must not fail")
            .is_none());
        assert_eq!(3, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn test_cached_refresh_none_clears_cache() {
        let _ = env_logger::builder().is_test(true).try_init();

        let scheduler = Arc::new(ManualScheduler::default());
        let inner = QueueProvider::new([
            Ok(Some(with_ttl("test_key", Duration::from_secs(300)))),
            Ok(None),
        ]);
        let provider = CachedCredentialProvider::new(inner, scheduler.clone());

        provider
            .provide_credential()
            .expect("load must not fail")
            .expect("credential must be found");

        scheduler.fire_all();

        assert_eq!(0, scheduler.pending());
        assert!(provider
            .provide_credential()
            .expect("load must not fail")
            .is_none());
    }

    #[test]
    fn test_cached_stop_keeps_last_credential() {
        let _ = env_logger::builder().is_test(true).try_init();

        let scheduler = Arc::new(ManualScheduler::default());
        let inner = QueueProvider::new([Ok(Some(with_ttl("test_key", Duration::from_secs(300))))]);
        let calls = inner.calls.clone();
        let stopped = inner.stopped.clone();
        let provider = CachedCredentialProvider::new(inner, scheduler.clone());

        provider
            .provide_credential()
            .expect("load must not fail")
            .expect("credential must be found");

        provider.stop();
        assert!(stopped.load(Ordering::SeqCst));

        // The pending refresh was cancelled.
        scheduler.fire_all();
        assert_eq!(1, calls.load(Ordering::SeqCst));

        // The last credential keeps being served until invalidated.
        let cred = provider
            .provide_credential()
            .expect("load must not fail")
            .expect("credential must be found");
        assert_eq!("test_key", cred.access_key_id);

        provider.invalidate();
        assert!(provider
            .provide_credential()
            .expect("load must not fail")
            .is_none());
    }

    #[test]
    fn test_cached_stop_before_any_load() {
        let _ = env_logger::builder().is_test(true).try_init();

        let scheduler = Arc::new(ManualScheduler::default());
        let inner = QueueProvider::new([Ok(Some(with_ttl("test_key", Duration::from_secs(300))))]);
        let provider = CachedCredentialProvider::new(inner, scheduler.clone());

        provider.stop();

        // Loading still works, but no refresh gets scheduled.
        provider
            .provide_credential()
            .expect("load must not fail")
            .expect("credential must be found");
        assert_eq!(0, scheduler.pending());
    }
}

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak},
    time::Duration,
};

use anyhow::bail;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::{
    runtime::Handle,
    sync::watch,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;

use crate::{
    delegate::ScheduledLocationDelegate,
    filter::SignificanceFilter,
    location::{Location, LocationError, LocationService},
    prelude::*,
    settings::{DEFAULT_INTERVAL_SECONDS, ManagerSettings},
};

type DelegateRef = Weak<dyn ScheduledLocationDelegate>;

/// Counters for what a manager has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollStats {
    /// Requests made to the location service
    pub requests: u64,
    /// Update batches handed to the delegate
    pub updates: u64,
    /// Failures handed to the delegate
    pub failures: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner<L: LocationService> {
    location: L,
    delegate: RwLock<Option<DelegateRef>>,
    filter: Mutex<Option<SignificanceFilter>>,
    stats: Mutex<PollStats>,
}

impl<L: LocationService> Inner<L> {
    fn delegate(&self) -> Option<Arc<dyn ScheduledLocationDelegate>> {
        self.delegate
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    fn handle_locations(&self, locations: Vec<Location>) {
        let locations = match lock(&self.filter).as_mut() {
            Some(filter) => filter.apply(locations),
            None => locations,
        };

        if locations.is_empty() {
            debug!("Nothing to report from location update");
            return;
        }

        let Some(delegate) = self.delegate() else {
            debug!("No delegate registered, dropping {} locations", locations.len());
            return;
        };

        lock(&self.stats).updates += 1;
        delegate.did_update_locations(&locations);
    }

    fn handle_error(&self, error: LocationError) {
        warn!("Location service failed: {error}");

        let Some(delegate) = self.delegate() else {
            debug!("No delegate registered, dropping error");
            return;
        };

        lock(&self.stats).failures += 1;
        delegate.did_fail_with_error(&error);
    }

    async fn poll_once(&self) {
        lock(&self.stats).requests += 1;
        debug!("Requesting location");
        match self.location.request_location().await {
            Ok(locations) => self.handle_locations(locations),
            Err(why) => self.handle_error(why),
        }
    }
}

/// Periodically asks a [LocationService] for the current position and forwards the results to a
/// [ScheduledLocationDelegate].
///
/// Dropping the manager stops any polling it's doing.
pub struct ScheduledLocationManager<L: LocationService> {
    inner: Arc<Inner<L>>,
    interval: watch::Sender<u32>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl<L: LocationService + 'static> ScheduledLocationManager<L> {
    pub fn new(location: L) -> Self {
        let (interval, _) = watch::channel(DEFAULT_INTERVAL_SECONDS);
        Self {
            inner: Arc::new(Inner {
                location,
                delegate: RwLock::new(None),
                filter: Mutex::new(None),
                stats: Mutex::new(PollStats::default()),
            }),
            interval,
            cancel: Mutex::new(None),
        }
    }

    pub fn with_settings(location: L, settings: &ManagerSettings) -> Result<Self> {
        let manager = Self::new(location);
        manager.set_check_location_interval(settings.interval_seconds)?;
        *lock(&manager.inner.filter) = settings.filter.map(SignificanceFilter::new);
        Ok(manager)
    }

    /// Start requesting the location every `interval` seconds, the first request is made
    /// immediately. If we're already polling, the current wait restarts with the new interval.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn get_user_location_with_interval(&self, interval: u32) -> Result {
        let mut cancel = lock(&self.cancel);

        if cancel.as_ref().is_some_and(|c| !c.is_cancelled()) {
            return self.set_check_location_interval(interval);
        }

        let handle = Handle::try_current().context("Location polling needs a Tokio runtime")?;
        self.set_check_location_interval(interval)?;

        let token = CancellationToken::new();

        handle.spawn(Self::poll_loop(
            self.inner.clone(),
            self.interval.subscribe(),
            token.clone(),
        ));

        info!("Started location updates every {interval}s");
        *cancel = Some(token);

        Ok(())
    }

    /// Seconds between location requests
    pub fn check_location_interval(&self) -> u32 {
        *self.interval.borrow()
    }

    /// Change the seconds between location requests. A running poll loop restarts its current
    /// wait with the new interval.
    pub fn set_check_location_interval(&self, interval: u32) -> Result {
        if interval == 0 {
            bail!("Location interval must be at least one second");
        }
        self.interval.send_replace(interval);
        Ok(())
    }

    /// Register the receiver of location callbacks, replacing any previous one. Only a weak
    /// reference is kept.
    pub fn set_delegate<D: ScheduledLocationDelegate + 'static>(&self, delegate: &Arc<D>) {
        let delegate = Arc::<D>::downgrade(delegate);
        self.set_delegate_weak(delegate);
    }

    /// Like [Self::set_delegate], for callers that already hold a type-erased delegate
    pub fn set_delegate_weak(&self, delegate: Weak<dyn ScheduledLocationDelegate>) {
        *self
            .inner
            .delegate
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(delegate);
    }

    pub fn clear_delegate(&self) {
        *self
            .inner
            .delegate
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The current delegate, if one is registered and still alive
    pub fn delegate(&self) -> Option<Arc<dyn ScheduledLocationDelegate>> {
        self.inner.delegate()
    }

    /// Entry point for the location service's update callback
    pub fn handle_locations(&self, locations: Vec<Location>) {
        self.inner.handle_locations(locations);
    }

    /// Entry point for the location service's failure callback
    pub fn handle_error(&self, error: LocationError) {
        self.inner.handle_error(error);
    }

    pub fn stop_updating(&self) {
        if let Some(token) = lock(&self.cancel).take() {
            token.cancel();
            info!("Stopped location updates");
        }
    }

    pub fn is_updating(&self) -> bool {
        lock(&self.cancel)
            .as_ref()
            .is_some_and(|c| !c.is_cancelled())
    }

    pub fn stats(&self) -> PollStats {
        *lock(&self.inner.stats)
    }

    pub fn reset_stats(&self) {
        *lock(&self.inner.stats) = PollStats::default();
    }

    async fn poll_loop(
        inner: Arc<Inner<L>>,
        mut interval: watch::Receiver<u32>,
        cancel: CancellationToken,
    ) {
        'poll: loop {
            let requested_at = Instant::now();

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break 'poll,

                _ = inner.poll_once() => {}
            }

            let mut wait_from = requested_at;

            loop {
                let secs = *interval.borrow_and_update();
                let deadline = wait_from + Duration::from_secs(u64::from(secs));

                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => break 'poll,

                    changed = interval.changed() => {
                        if changed.is_err() {
                            break 'poll;
                        }
                        debug!("Location interval changed mid-wait, restarting wait");
                        wait_from = Instant::now();
                    }

                    _ = sleep_until(deadline) => break,
                }
            }
        }

        debug!("Location poll loop exited");
    }
}

impl<L: LocationService> Drop for ScheduledLocationManager<L> {
    fn drop(&mut self) {
        if let Some(token) = lock(&self.cancel).take() {
            token.cancel();
        }
    }
}

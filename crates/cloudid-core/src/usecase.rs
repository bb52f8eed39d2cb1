//! Running store operations on behalf of a UI layer.
//!
//! A [`UseCaseRunner`] executes one operation at a time and reports its
//! progress as [`UiResult`] values wrapped in single-consumption [`Event`]s.

use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::debug;

use crate::{Error, Result};

/// A value that can be handled at most once.
#[derive(Debug)]
pub struct Event<T> {
    content: Option<T>,
}

impl<T> Event<T> {
    /// Wrap a value.
    #[must_use]
    pub const fn new(content: T) -> Self {
        Self {
            content: Some(content),
        }
    }

    /// Take the content, leaving the event handled.
    pub const fn take(&mut self) -> Option<T> {
        self.content.take()
    }

    /// Look at the content without handling it.
    #[must_use]
    pub const fn peek(&self) -> Option<&T> {
        self.content.as_ref()
    }

    /// Whether the content was already taken.
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        self.content.is_none()
    }
}

/// Progress of one operation.
#[derive(Debug)]
pub enum UiResult<T> {
    /// Work started; carries cached data when available.
    Loading(Option<T>),
    /// Work finished with a value.
    Success(T),
    /// Work failed; carries cached data when available.
    Error {
        /// The failure.
        error: Error,
        /// Data shown while loading.
        data: Option<T>,
    },
}

/// Which events a run publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Publish `Loading` before starting.
    pub show_loading: bool,
    /// Publish `Success` on completion.
    pub post_success: bool,
    /// Publish `Error` on failure.
    pub post_error: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            show_loading: false,
            post_success: true,
            post_error: true,
        }
    }
}

impl RunOptions {
    /// Publish `Loading` as well.
    #[must_use]
    pub const fn with_loading(mut self) -> Self {
        self.show_loading = true;
        self
    }

    /// Publish failures only.
    #[must_use]
    pub const fn only_error() -> Self {
        Self {
            show_loading: false,
            post_success: false,
            post_error: true,
        }
    }
}

/// Receiving side of a runner's events.
pub type EventReceiver<T> = mpsc::UnboundedReceiver<Event<UiResult<T>>>;

/// Executes at most one operation at a time and publishes its outcome.
#[derive(Debug)]
pub struct UseCaseRunner<T> {
    events: mpsc::UnboundedSender<Event<UiResult<T>>>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the run ends, including on cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T: Debug> UseCaseRunner<T> {
    /// Create a runner and the receiver for its events.
    #[must_use]
    pub fn new() -> (Self, EventReceiver<T>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let runner = Self {
            events,
            in_flight: AtomicBool::new(false),
        };
        (runner, receiver)
    }

    /// Whether an operation is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run `work`, publishing events according to `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] without running `work` if another operation is
    /// in flight. The outcome of `work` itself is published, not returned.
    pub async fn run<F>(&self, options: RunOptions, work: F) -> Result<()>
    where
        F: Future<Output = Result<T>>,
    {
        let _guard = self.begin()?;

        if options.show_loading {
            self.publish(UiResult::Loading(None));
        }

        let result = work.await;
        debug!("Use case finished: {result:?}");

        match result {
            Ok(value) if options.post_success => self.publish(UiResult::Success(value)),
            Err(error) if options.post_error => {
                self.publish(UiResult::Error { error, data: None });
            }
            _ => {}
        }
        Ok(())
    }

    /// Run `work` while showing `cached` data.
    ///
    /// Publishes `Loading` with the cached data, then only a failure (again
    /// with the cached data). A successful result is dropped; the caller is
    /// expected to observe fresh data elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if another operation is in flight.
    pub async fn run_with_cached<U, F>(&self, cached: Option<T>, work: F) -> Result<()>
    where
        T: Clone,
        U: Debug,
        F: Future<Output = Result<U>>,
    {
        let _guard = self.begin()?;

        self.publish(UiResult::Loading(cached.clone()));

        let result = work.await;
        debug!("Use case finished: {result:?}");

        if let Err(error) = result {
            self.publish(UiResult::Error {
                error,
                data: cached,
            });
        }
        Ok(())
    }

    fn begin(&self) -> Result<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(InFlight(&self.in_flight))
    }

    fn publish(&self, result: UiResult<T>) {
        if self.events.send(Event::new(result)).is_err() {
            debug!("Event receiver dropped, discarding result");
        }
    }
}

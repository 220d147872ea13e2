//! Error categorization, bounded history and retry-with-backoff.
//!
//! [`ErrorHandlerService`] is where failures from the editor, the transport
//! and the save pipeline end up:
//!
//! - [`log_error`](ErrorHandlerService::log_error) records an [`ErrorRecord`]
//!   in a bounded FIFO history, updates per-category and per-context counts,
//!   broadcasts `app-error` and calls every registered error callback.
//! - [`handle_async`](ErrorHandlerService::handle_async) runs an async
//!   operation with exponential back-off and reports the result as an
//!   [`AsyncOutcome`] instead of an error.
//! - [`wrap_with_error_handling`](ErrorHandlerService::wrap_with_error_handling)
//!   logs failures of a function and hands the original error back to the caller.

mod category;
mod record;
mod retry;

pub use category::{ErrorCategory, categorize_error, is_recoverable};
pub use record::{ErrorInfo, ErrorRecord};
pub use retry::{AsyncOutcome, HandleAsyncOptions, OnErrorCallback, backoff_delay};

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::json;

use crate::BoxFuture;
use crate::callback_registry::{CallbackRegistry, EventCallback, SubscriptionId, panic_message};
use crate::clock::Clock;
use crate::config::CollabConfig;
use crate::events::{AppEvent, EventBus};

/// Aggregated error statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorStats {
    /// Errors logged since the last clear, including evicted ones.
    pub total: u64,
    /// Records currently held in the history.
    pub retained: usize,
    /// Counts per category.
    pub by_category: HashMap<ErrorCategory, u64>,
    /// Counts per context.
    pub by_context: HashMap<String, u64>,
}

#[derive(Default)]
struct ErrorLog {
    history: VecDeque<ErrorRecord>,
    stats: ErrorStats,
}

/// Categorizes, records and retries failures.
pub struct ErrorHandlerService {
    log: Mutex<ErrorLog>,
    capacity: usize,
    config: CollabConfig,
    callbacks: CallbackRegistry<ErrorRecord>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl ErrorHandlerService {
    /// Create a handler publishing on `bus`.
    pub fn new(bus: Arc<EventBus>, clock: Arc<dyn Clock>, config: CollabConfig) -> Self {
        Self {
            log: Mutex::new(ErrorLog::default()),
            capacity: config.max_error_history.max(1),
            config,
            callbacks: CallbackRegistry::new("ErrorHandler"),
            bus,
            clock,
        }
    }

    // =========================================================================
    // Logging
    // =========================================================================

    /// Record an error and notify listeners. Returns the stored record.
    pub fn log_error(
        &self,
        error: impl Into<ErrorInfo>,
        context: &str,
        metadata: serde_json::Value,
    ) -> ErrorRecord {
        let info = error.into();
        let record = ErrorRecord {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: self.clock.now(),
            context: context.to_string(),
            category: categorize_error(&info),
            name: info.name,
            message: info.message,
            stack: info.stack,
            metadata,
        };

        {
            let mut log = self.log.lock().unwrap();
            while log.history.len() >= self.capacity {
                log.history.pop_front();
            }
            log.history.push_back(record.clone());
            log.stats.total += 1;
            log.stats.retained = log.history.len();
            *log.stats.by_category.entry(record.category).or_insert(0) += 1;
            *log
                .stats
                .by_context
                .entry(record.context.clone())
                .or_insert(0) += 1;
        }

        log::error!(
            "[{}] {} error: {}: {}",
            record.context,
            record.category,
            record.name,
            record.message
        );

        self.bus.emit(&AppEvent::AppError {
            record: record.clone(),
            source: record.context.clone(),
        });
        self.callbacks.emit(&record);
        record
    }

    /// Log a warning and broadcast `app-warning`. Warnings are not kept in the history.
    pub fn log_warning(&self, message: &str, context: &str, metadata: serde_json::Value) {
        log::warn!("[{}] {}", context, message);
        self.bus.emit(&AppEvent::AppWarning {
            message: message.to_string(),
            metadata,
            source: context.to_string(),
        });
    }

    /// Register a callback for every logged error.
    pub fn on_error(&self, callback: EventCallback<ErrorRecord>) -> SubscriptionId {
        self.callbacks.subscribe(callback)
    }

    /// Remove an error callback.
    pub fn off_error(&self, id: SubscriptionId) -> bool {
        self.callbacks.unsubscribe(id)
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Heuristic category of an error.
    pub fn categorize_error(&self, error: &ErrorInfo) -> ErrorCategory {
        categorize_error(error)
    }

    /// Whether retrying might help.
    pub fn is_recoverable(&self, error: &ErrorInfo) -> bool {
        is_recoverable(error)
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Up to `limit` most recent records, newest last.
    pub fn recent_errors(&self, limit: usize) -> Vec<ErrorRecord> {
        let log = self.log.lock().unwrap();
        let skip = log.history.len().saturating_sub(limit);
        log.history.iter().skip(skip).cloned().collect()
    }

    /// Number of records currently held.
    pub fn history_len(&self) -> usize {
        self.log.lock().unwrap().history.len()
    }

    /// Aggregated counts.
    pub fn stats(&self) -> ErrorStats {
        self.log.lock().unwrap().stats.clone()
    }

    /// Drop the history and the counts.
    pub fn clear(&self) {
        *self.log.lock().unwrap() = ErrorLog::default();
    }

    // =========================================================================
    // Async operations
    // =========================================================================

    /// Run `operation`, retrying failures with exponential back-off.
    ///
    /// The operation runs at most `retries + 1` times; retry `n` (0-based) waits
    /// `retry_delay * 2^n` first. The first success is returned at once. When
    /// every attempt fails the last error is logged, `on_error` is called and
    /// the outcome carries the error and the fallback value.
    pub async fn handle_async<T, E, F, Fut>(
        &self,
        mut operation: F,
        context: &str,
        options: HandleAsyncOptions<T, E>,
    ) -> AsyncOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let retries = options.retries.unwrap_or(self.config.default_retries);
        let base_delay = options
            .retry_delay
            .unwrap_or_else(|| self.config.default_retry_delay());

        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(data) => return AsyncOutcome::success(data, attempt + 1),
                Err(error) if attempt < retries => {
                    let delay = backoff_delay(base_delay, attempt);
                    log::debug!(
                        "[{}] attempt {} failed ({}), retrying in {:?}",
                        context,
                        attempt + 1,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    let attempts = attempt + 1;
                    self.log_error(
                        ErrorInfo::from_display(&error),
                        context,
                        json!({ "attempts": attempts, "retries": retries }),
                    );
                    if let Some(on_error) = options.on_error {
                        on_error(&error);
                    }
                    return AsyncOutcome::failure(error, options.fallback_value, attempts);
                }
            }
        }
    }

    // =========================================================================
    // Wrapping
    // =========================================================================

    /// Wrap a fallible function so its errors and panics are logged under
    /// `context`. The original error is returned and panics keep unwinding.
    pub fn wrap_with_error_handling<A, T, E, F>(
        self: &Arc<Self>,
        f: F,
        context: &str,
    ) -> impl Fn(A) -> Result<T, E> + use<A, T, E, F>
    where
        F: Fn(A) -> Result<T, E>,
        E: fmt::Display,
    {
        let handler = Arc::clone(self);
        let context = context.to_string();
        move |args| match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(args))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => {
                handler.log_error(
                    ErrorInfo::from_display(&error),
                    &context,
                    json!({ "wrapped": true }),
                );
                Err(error)
            }
            Err(payload) => {
                handler.log_error(
                    ErrorInfo::new("Panic", panic_message(payload.as_ref())),
                    &context,
                    json!({ "wrapped": true, "panic": true }),
                );
                std::panic::resume_unwind(payload)
            }
        }
    }

    /// Async counterpart of [`wrap_with_error_handling`](Self::wrap_with_error_handling):
    /// failed futures are logged and their error is passed through.
    pub fn wrap_async<A, T, E, F, Fut>(
        self: &Arc<Self>,
        f: F,
        context: &str,
    ) -> impl Fn(A) -> BoxFuture<'static, Result<T, E>> + use<A, T, E, F, Fut>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let handler = Arc::clone(self);
        let context: Arc<str> = Arc::from(context);
        move |args| {
            let future = f(args);
            let handler = Arc::clone(&handler);
            let context = Arc::clone(&context);
            Box::pin(async move {
                let result = future.await;
                if let Err(error) = &result {
                    handler.log_error(
                        ErrorInfo::from_display(error),
                        &context,
                        json!({ "wrapped": true, "async": true }),
                    );
                }
                result
            })
        }
    }
}

impl fmt::Debug for ErrorHandlerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandlerService")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::events::new_event_bus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn handler() -> Arc<ErrorHandlerService> {
        Arc::new(ErrorHandlerService::new(
            new_event_bus(),
            Arc::new(SystemClock),
            CollabConfig::default(),
        ))
    }

    #[test]
    fn test_log_error_records_and_counts() {
        let handler = handler();
        let record = handler.log_error("Failed to fetch", "save", json!({ "doc": "d1" }));

        assert_eq!(record.category, ErrorCategory::Network);
        assert_eq!(record.context, "save");
        assert_eq!(record.metadata["doc"], "d1");
        assert!(!record.id.is_empty());

        handler.log_error("401 unauthorized", "save", serde_json::Value::Null);
        let stats = handler.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_category[&ErrorCategory::Network], 1);
        assert_eq!(stats.by_category[&ErrorCategory::Auth], 1);
        assert_eq!(stats.by_context["save"], 2);
    }

    #[test]
    fn test_history_is_bounded_fifo() {
        let handler = handler();
        for i in 0..150 {
            handler.log_error(format!("error {}", i), "loop", serde_json::Value::Null);
            assert!(handler.history_len() <= 100);
        }

        assert_eq!(handler.history_len(), 100);
        let recent = handler.recent_errors(100);
        assert_eq!(recent.first().unwrap().message, "error 50");
        assert_eq!(recent.last().unwrap().message, "error 149");
        assert_eq!(handler.stats().total, 150);
        assert_eq!(handler.stats().retained, 100);
    }

    #[test]
    fn test_configured_capacity() {
        let handler = ErrorHandlerService::new(
            new_event_bus(),
            Arc::new(SystemClock),
            CollabConfig {
                max_error_history: 3,
                ..CollabConfig::default()
            },
        );
        for i in 0..5 {
            handler.log_error(format!("e{}", i), "ctx", serde_json::Value::Null);
        }
        let messages: Vec<String> = handler
            .recent_errors(10)
            .into_iter()
            .map(|r| r.message)
            .collect();
        assert_eq!(messages, vec!["e2", "e3", "e4"]);
    }

    #[test]
    fn test_callbacks_isolated_and_bus_notified() {
        let bus = new_event_bus();
        let handler =
            ErrorHandlerService::new(Arc::clone(&bus), Arc::new(SystemClock), CollabConfig::default());

        let bus_events = Arc::new(AtomicUsize::new(0));
        let bus_events_clone = Arc::clone(&bus_events);
        bus.subscribe(Arc::new(move |event: &AppEvent| {
            if event.event_name() == "app-error" {
                bus_events_clone.fetch_add(1, Ordering::SeqCst);
            }
        }));

        let calls = Arc::new(AtomicUsize::new(0));
        handler.on_error(Arc::new(|_| {
            panic!("callback bug");
        }));
        let calls_clone = Arc::clone(&calls);
        let id = handler.on_error(Arc::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        handler.log_error("boom", "ctx", serde_json::Value::Null);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus_events.load(Ordering::SeqCst), 1);

        assert!(handler.off_error(id));
        handler.log_error("boom", "ctx", serde_json::Value::Null);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_log_warning_emits_app_warning() {
        let bus = new_event_bus();
        let handler =
            ErrorHandlerService::new(Arc::clone(&bus), Arc::new(SystemClock), CollabConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        bus.subscribe(Arc::new(move |event: &AppEvent| {
            seen_clone.lock().unwrap().push(event.event_name());
        }));

        handler.log_warning("Slow sync", "provider", json!({ "ms": 4000 }));
        assert_eq!(*seen.lock().unwrap(), vec!["app-warning"]);
        assert_eq!(handler.history_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_async_retries_then_fails() {
        let handler = handler();
        let calls = Arc::new(AtomicUsize::new(0));
        let final_errors = Arc::new(AtomicUsize::new(0));

        let calls_clone = Arc::clone(&calls);
        let final_clone = Arc::clone(&final_errors);
        let outcome = handler
            .handle_async(
                || {
                    calls_clone.fetch_add(1, Ordering::SeqCst);
                    async { Err::<u32, String>("Failed to fetch".to_string()) }
                },
                "save",
                HandleAsyncOptions::default()
                    .retries(2)
                    .retry_delay(Duration::from_millis(10))
                    .fallback(0)
                    .on_error(move |_| {
                        final_clone.fetch_add(1, Ordering::SeqCst);
                    }),
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!outcome.success);
        assert_eq!(outcome.data, Some(0));
        assert_eq!(outcome.error.as_deref(), Some("Failed to fetch"));
        assert_eq!(outcome.attempts, 3);
        assert_eq!(final_errors.load(Ordering::SeqCst), 1);
        // Only the final failure is logged
        assert_eq!(handler.history_len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_async_backoff_timing() {
        let handler = handler();
        let start = tokio::time::Instant::now();

        let _ = handler
            .handle_async(
                || async { Err::<(), &str>("offline") },
                "sync",
                HandleAsyncOptions::default()
                    .retries(3)
                    .retry_delay(Duration::from_millis(10)),
            )
            .await;

        // 10 + 20 + 40
        assert_eq!(start.elapsed(), Duration::from_millis(70));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_async_stops_at_first_success() {
        let handler = handler();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = Arc::clone(&calls);
        let outcome = handler
            .handle_async(
                || {
                    let n = calls_clone.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            Err("temporary".to_string())
                        } else {
                            Ok(n)
                        }
                    }
                },
                "load",
                HandleAsyncOptions::default()
                    .retries(5)
                    .retry_delay(Duration::from_millis(1)),
            )
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.data, Some(1));
        assert!(outcome.error.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(handler.history_len(), 0);
    }

    #[tokio::test]
    async fn test_handle_async_default_has_no_retries() {
        let handler = handler();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let outcome = handler
            .handle_async(
                || {
                    calls_clone.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), &str>("nope") }
                },
                "ctx",
                HandleAsyncOptions::default(),
            )
            .await;

        assert!(!outcome.success);
        assert!(outcome.data.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wrap_passes_through_and_logs() {
        let handler = handler();
        let parse = handler.wrap_with_error_handling(
            |s: &str| s.parse::<u32>().map_err(|e| e.to_string()),
            "parse",
        );

        assert_eq!(parse("42"), Ok(42));
        assert_eq!(handler.history_len(), 0);

        let err = parse("x").unwrap_err();
        assert_eq!(err, "invalid digit found in string");
        let recent = handler.recent_errors(1);
        assert_eq!(recent[0].context, "parse");
        assert_eq!(recent[0].message, err);
    }

    #[test]
    fn test_wrap_logs_and_resumes_panics() {
        let handler = handler();
        let explode = handler.wrap_with_error_handling(
            |_: ()| -> Result<(), String> { panic!("render crashed") },
            "render",
        );

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| explode(())));
        assert!(result.is_err());
        let recent = handler.recent_errors(1);
        assert_eq!(recent[0].name, "Panic");
        assert_eq!(recent[0].message, "render crashed");
    }

    #[tokio::test]
    async fn test_wrap_async_passes_through_and_logs() {
        let handler = handler();
        let fetch = handler.wrap_async(
            |ok: bool| async move {
                if ok {
                    Ok::<_, String>("data")
                } else {
                    Err("Failed to fetch".to_string())
                }
            },
            "fetch",
        );

        assert_eq!(fetch(true).await, Ok("data"));
        assert_eq!(fetch(false).await, Err("Failed to fetch".to_string()));
        let recent = handler.recent_errors(5);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].category, ErrorCategory::Network);
    }
}

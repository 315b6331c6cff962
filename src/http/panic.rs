//! Handler panic capture.
//!
//! A panicking handler is the middleware's analogue of a handler raising an
//! exception. The panic hook records the message, location and a backtrace
//! into a thread-local slot while a captured future is being polled; the
//! unwind is then caught around the same poll, so the slot is read back on
//! the thread that wrote it.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};

use futures_util::FutureExt;

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static LAST_PANIC: RefCell<Option<Failure>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// A downstream failure recorded for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    message: String,
    location: Option<String>,
    backtrace: Option<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            backtrace: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Multi-line trace: location, message, then the backtrace if captured.
    pub fn trace(&self) -> String {
        let mut trace = match &self.location {
            Some(location) => format!("panicked at {location}:\n{}", self.message),
            None => self.message.clone(),
        };
        if let Some(backtrace) = &self.backtrace {
            trace.push_str("\nstack backtrace:\n");
            trace.push_str(backtrace);
        }
        trace
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Install the capturing panic hook once per process.
///
/// Panics outside a captured poll are passed to the previously installed
/// hook unchanged.
pub fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !CAPTURING.with(Cell::get) {
                previous(info);
                return;
            }
            let failure = Failure {
                message: payload_message(info.payload()),
                location: info.location().map(|l| l.to_string()),
                backtrace: Some(Backtrace::force_capture().to_string()),
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(failure));
        }));
    });
}

/// Text of a panic payload (`&str` or `String`).
pub fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Panic payload kept so the unwind can be resumed later.
pub type Payload = Box<dyn Any + Send + 'static>;

/// Run `future`, converting a panic into a [`Failure`] plus its payload.
///
/// A panic that `future` caught itself (an inner `CatchPanicLayer`, a
/// handler's own `catch_unwind`) is returned next to the output.
pub async fn catch_panic<F>(future: F) -> Result<(F::Output, Option<Failure>), (Failure, Payload)>
where
    F: Future,
{
    LAST_PANIC.with(|slot| slot.borrow_mut().take());

    let captured = Capturing {
        inner: Box::pin(future),
    };
    match AssertUnwindSafe(captured).catch_unwind().await {
        Ok(output) => Ok((output, LAST_PANIC.with(|slot| slot.borrow_mut().take()))),
        Err(payload) => {
            let failure = LAST_PANIC
                .with(|slot| slot.borrow_mut().take())
                .unwrap_or_else(|| Failure::new(payload_message(payload.as_ref())));
            Err((failure, payload))
        }
    }
}

/// Marks every poll of the inner future as a capture scope.
struct Capturing<F> {
    inner: Pin<Box<F>>,
}

impl<F: Future> Future for Capturing<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _scope = Scope::enter();
        self.inner.as_mut().poll(cx)
    }
}

/// Restores the previous capture flag on drop, including during unwinding.
struct Scope {
    previous: bool,
}

impl Scope {
    fn enter() -> Self {
        Self {
            previous: CAPTURING.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        CAPTURING.with(|flag| flag.set(self.previous));
    }
}

#![forbid(unsafe_code)]

//! Debounce and throttle wrappers over a notification handler.
//!
//! [`RateLimited::wrap`] maps an optional [`RefreshMode`] to a strategy:
//!
//! | Mode       | Behavior                                                    |
//! |------------|-------------------------------------------------------------|
//! | `None`     | every `invoke` calls the handler synchronously               |
//! | `Debounce` | trailing edge: one call with the latest args after a quiet interval |
//! | `Throttle` | leading call, then at most one trailing call per interval    |
//!
//! Timing comes from the host's [`TimerHost`], so a simulated host drives
//! the wrappers deterministically.
//!
//! # Failure Modes
//!
//! - **Timer refused**: if the host cannot arm a timer, the invocation is
//!   delivered synchronously and a warning is logged. Rate limiting degrades,
//!   notifications are never lost.

use crate::config::RefreshMode;
use crate::host::{TimerHandle, TimerHost};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::{trace, warn};

type Handler<A> = Rc<dyn Fn(A)>;

/// Shared timing state for the delayed strategies.
struct Window<A> {
    func: Handler<A>,
    interval: Duration,
    timers: Rc<dyn TimerHost>,
    /// Latest arguments waiting for the trailing edge.
    pending: Option<A>,
    /// Armed timer. For throttle this doubles as "window open".
    timer: Option<TimerHandle>,
}

enum Strategy<A> {
    Direct(Handler<A>),
    Debounce(Rc<RefCell<Window<A>>>),
    Throttle(Rc<RefCell<Window<A>>>),
}

/// A handler wrapped with an optional rate-limiting strategy.
///
/// Cloning shares the same strategy state.
pub struct RateLimited<A: 'static> {
    strategy: Strategy<A>,
}

impl<A: 'static> Clone for RateLimited<A> {
    fn clone(&self) -> Self {
        let strategy = match &self.strategy {
            Strategy::Direct(func) => Strategy::Direct(Rc::clone(func)),
            Strategy::Debounce(state) => Strategy::Debounce(Rc::clone(state)),
            Strategy::Throttle(state) => Strategy::Throttle(Rc::clone(state)),
        };
        Self { strategy }
    }
}

impl<A: 'static> fmt::Debug for RateLimited<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimited")
            .field("mode", &self.mode())
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl<A: 'static> RateLimited<A> {
    /// Wrap `func` according to `mode`.
    pub fn wrap(
        mode: Option<RefreshMode>,
        interval: Duration,
        timers: Rc<dyn TimerHost>,
        func: impl Fn(A) + 'static,
    ) -> Self {
        let func: Handler<A> = Rc::new(func);
        let window = |func: Handler<A>| {
            Rc::new(RefCell::new(Window {
                func,
                interval,
                timers,
                pending: None,
                timer: None,
            }))
        };
        let strategy = match mode {
            None => Strategy::Direct(func),
            Some(RefreshMode::Debounce) => Strategy::Debounce(window(func)),
            Some(RefreshMode::Throttle) => Strategy::Throttle(window(func)),
        };
        Self { strategy }
    }

    /// Wrap `func` without any rate limiting.
    pub fn direct(func: impl Fn(A) + 'static) -> Self {
        Self {
            strategy: Strategy::Direct(Rc::new(func)),
        }
    }

    /// The strategy this handler was built with.
    #[must_use]
    pub fn mode(&self) -> Option<RefreshMode> {
        match self.strategy {
            Strategy::Direct(_) => None,
            Strategy::Debounce(_) => Some(RefreshMode::Debounce),
            Strategy::Throttle(_) => Some(RefreshMode::Throttle),
        }
    }

    /// Deliver a notification through the strategy.
    pub fn invoke(&self, args: A) {
        match &self.strategy {
            Strategy::Direct(func) => func(args),
            Strategy::Debounce(state) => debounce(state, args),
            Strategy::Throttle(state) => throttle(state, args),
        }
    }

    /// Whether [`cancel`](Self::cancel) does anything for this strategy.
    #[must_use]
    pub fn has_cancel(&self) -> bool {
        !matches!(self.strategy, Strategy::Direct(_))
    }

    /// Whether a delayed invocation is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        match &self.strategy {
            Strategy::Direct(_) => false,
            Strategy::Debounce(state) | Strategy::Throttle(state) => {
                state.borrow().pending.is_some()
            }
        }
    }

    /// Disarm the timer and drop any delayed invocation.
    pub fn cancel(&self) {
        let state = match &self.strategy {
            Strategy::Direct(_) => return,
            Strategy::Debounce(state) | Strategy::Throttle(state) => state,
        };
        let (timers, timer, discarded) = {
            let mut w = state.borrow_mut();
            let discarded = w.pending.take().is_some();
            (Rc::clone(&w.timers), w.timer.take(), discarded)
        };
        if let Some(handle) = timer {
            timers.clear_timeout(handle);
        }
        trace!(discarded, "rate limiter cancelled");
    }
}

/// Arm the window timer; `on_expire` runs when it fires.
///
/// Returns `false` if the host refused to arm a timer.
fn arm<A: 'static>(
    state: &Rc<RefCell<Window<A>>>,
    on_expire: fn(&Rc<RefCell<Window<A>>>),
) -> bool {
    let (timers, interval) = {
        let w = state.borrow();
        (Rc::clone(&w.timers), w.interval)
    };
    let weak: Weak<RefCell<Window<A>>> = Rc::downgrade(state);
    let handle = timers.set_timeout(
        interval,
        Box::new(move || {
            if let Some(state) = weak.upgrade() {
                on_expire(&state);
            }
        }),
    );
    state.borrow_mut().timer = handle;
    handle.is_some()
}

fn debounce<A: 'static>(state: &Rc<RefCell<Window<A>>>, args: A) {
    let (timers, previous) = {
        let mut w = state.borrow_mut();
        w.pending = Some(args);
        (Rc::clone(&w.timers), w.timer.take())
    };
    if let Some(handle) = previous {
        timers.clear_timeout(handle);
    }
    if !arm(state, debounce_expired) {
        warn!("timer unavailable, delivering debounced notification immediately");
        debounce_expired(state);
    }
}

fn debounce_expired<A: 'static>(state: &Rc<RefCell<Window<A>>>) {
    let (func, args) = {
        let mut w = state.borrow_mut();
        w.timer = None;
        (Rc::clone(&w.func), w.pending.take())
    };
    if let Some(args) = args {
        func(args);
    }
}

fn throttle<A: 'static>(state: &Rc<RefCell<Window<A>>>, args: A) {
    let func = {
        let mut w = state.borrow_mut();
        if w.timer.is_some() {
            w.pending = Some(args);
            return;
        }
        Rc::clone(&w.func)
    };
    // Leading edge. The window opens before the call so re-entrant
    // invocations from `func` land in the trailing slot.
    if !arm(state, throttle_expired) {
        warn!("timer unavailable, delivering throttled notification immediately");
    }
    func(args);
}

fn throttle_expired<A: 'static>(state: &Rc<RefCell<Window<A>>>) {
    let (func, args) = {
        let mut w = state.borrow_mut();
        w.timer = None;
        (Rc::clone(&w.func), w.pending.take())
    };
    if let Some(args) = args {
        // Trailing edge opens the next window.
        arm(state, throttle_expired);
        func(args);
    }
}

//! The hook engine: system-wide keyboard and mouse interception on a dedicated
//! pump thread, with handler dispatch and propagation control.
//!
//! A [`HookListener`] owns one pump thread while running. The thread installs
//! the keyboard and mouse hooks through a [`Backend`], services the OS message
//! queue until [`HookListener::stop`] is called, and uninstalls both hooks
//! before it exits.
//!
//! # Handler obligations
//!
//! Handlers run synchronously on the pump thread, and the operating system
//! waits for them before delivering the input anywhere else. Windows silently
//! removes a low-level hook whose procedure does not return within its
//! timeout, so handlers **must return quickly**. Hand longer work off to
//! another thread. This is not enforced.
//!
//! A handler may call [`HookListener::stop`], [`HookListener::start`] and
//! [`HookListener::join`] on its own listener. `join` returns at once on the
//! pump thread, and a restart leaves the current thread to exit after the
//! handler returns.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, RwLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use crate::{
    error::{Error, Result},
    event::{Category, Event, KeyEvent, MouseEvent},
    platform::DefaultBackend,
};

/// What should happen to an event after the handlers have seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Forward the event to the next hook and the target application.
    #[default]
    Pass,
    /// Swallow the event so no other application receives it.
    Suppress,
}

impl Propagation {
    pub fn is_suppressed(self) -> bool {
        self == Propagation::Suppress
    }
}

impl From<bool> for Propagation {
    /// `true` suppresses, `false` passes through.
    fn from(suppress: bool) -> Self {
        if suppress {
            Propagation::Suppress
        } else {
            Propagation::Pass
        }
    }
}

impl From<()> for Propagation {
    fn from(_: ()) -> Self {
        Propagation::Pass
    }
}

/// A platform's low-level hook implementation.
///
/// [`Backend::install`] and [`Backend::pump`] are only ever called on the pump
/// thread, and the returned hooks never leave it. Dropping the hooks must
/// uninstall them.
pub trait Backend: Send + Sync + 'static {
    /// The installed hooks, owned by the pump thread.
    type Hooks;

    /// Installs the keyboard and mouse hooks, routing their events to `dispatcher`.
    fn install(&self, dispatcher: Arc<Dispatcher>) -> Result<Self::Hooks>;

    /// Processes at most one pending OS message.
    ///
    /// Returns `false` if there was nothing to do, in which case the pump
    /// thread sleeps for the poll interval.
    fn pump(&self, hooks: &mut Self::Hooks) -> bool;

    /// Queries the current cursor position in screen coordinates.
    fn cursor_position(&self) -> Result<(i32, i32)>;
}

/// Configuration for a [`HookListener`].
#[derive(Debug, Clone)]
pub struct Config {
    /// How long the pump thread sleeps when no message is pending. Bounds the
    /// latency of [`HookListener::stop`].
    pub poll_interval: Duration,
    /// Events carrying this `extra_info` value pass through without being
    /// dispatched. Use it to ignore input you injected yourself.
    pub ignore_extra_info: Option<usize>,
    /// Name given to the pump thread.
    pub thread_name: String,
}

impl Config {
    pub fn set_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn set_ignore_extra_info(mut self, marker: usize) -> Self {
        self.ignore_extra_info = Some(marker);
        self
    }

    pub fn set_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            ignore_extra_info: None,
            thread_name: "inputhook-pump".to_owned(),
        }
    }
}

type Handler = dyn Fn(&Event) -> Propagation + Send + Sync + 'static;

#[derive(Default)]
struct HandlerTable {
    key_down: Vec<Arc<Handler>>,
    key_up: Vec<Arc<Handler>>,
    mouse_down: Vec<Arc<Handler>>,
    mouse_up: Vec<Arc<Handler>>,
}

impl HandlerTable {
    fn get(&self, category: Category) -> &Vec<Arc<Handler>> {
        match category {
            Category::KeyDown => &self.key_down,
            Category::KeyUp => &self.key_up,
            Category::MouseDown => &self.mouse_down,
            Category::MouseUp => &self.mouse_up,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut Vec<Arc<Handler>> {
        match category {
            Category::KeyDown => &mut self.key_down,
            Category::KeyUp => &mut self.key_up,
            Category::MouseDown => &mut self.mouse_down,
            Category::MouseUp => &mut self.mouse_up,
        }
    }
}

/// The per-engine handler table and the dispatch routine the hooks call into.
///
/// Dispatch works on a snapshot of the handlers for the event's category, so
/// handlers may be registered at any time, including from inside a handler.
pub struct Dispatcher {
    handlers: RwLock<HandlerTable>,
    ignore_extra_info: Option<usize>,
}

impl Dispatcher {
    pub fn new(ignore_extra_info: Option<usize>) -> Self {
        Self {
            handlers: Default::default(),
            ignore_extra_info,
        }
    }

    /// Appends a handler to `category`. Handlers run in registration order.
    pub fn add<F, R>(&self, category: Category, handler: F)
    where
        F: Fn(&Event) -> R + Send + Sync + 'static,
        R: Into<Propagation>,
    {
        let handler: Arc<Handler> =
            Arc::new(move |event: &Event| -> Propagation { handler(event).into() });
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(category)
            .push(handler);
    }

    /// Number of handlers registered for `category`.
    pub fn handler_count(&self, category: Category) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(category)
            .len()
    }

    /// Runs every handler registered for the event's category and returns the
    /// combined decision.
    ///
    /// All handlers run even after one has asked for suppression. A panicking
    /// handler is logged and counts as [`Propagation::Pass`].
    pub fn dispatch(&self, event: &Event) -> Propagation {
        if self.ignore_extra_info == Some(event.extra_info()) {
            return Propagation::Pass;
        }

        let category = event.category();
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(category)
            .clone();

        let mut decision = Propagation::Pass;
        for (_index, handler) in handlers.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Propagation::Suppress) => decision = Propagation::Suppress,
                Ok(Propagation::Pass) => {}
                Err(_payload) => {
                    #[cfg(feature = "log")]
                    log::error!(
                        "{} handler #{} panicked: {}",
                        category,
                        _index,
                        panic_message(&*_payload)
                    );
                }
            }
        }

        #[cfg(feature = "log")]
        log::trace!("{} dispatched to {} handlers: {:?}", category, handlers.len(), decision);

        decision
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(feature = "log")]
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

/// A system-wide keyboard and mouse hook with its own pump thread.
///
/// See the [module documentation](self) for the obligations on handlers.
pub struct HookListener<B: Backend = DefaultBackend> {
    backend: Arc<B>,
    config: Config,
    dispatcher: Arc<Dispatcher>,
    running: Arc<AtomicBool>,
    /// Bumped by every start; a pump thread exits once it is outdated.
    generation: Arc<AtomicUsize>,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl HookListener<DefaultBackend> {
    /// Creates a listener for the current platform.
    pub fn new(config: Config) -> Self {
        Self::with_backend(DefaultBackend::default(), config)
    }
}

impl Default for HookListener<DefaultBackend> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<B: Backend> HookListener<B> {
    pub fn with_backend(backend: B, config: Config) -> Self {
        Self {
            backend: Arc::new(backend),
            dispatcher: Arc::new(Dispatcher::new(config.ignore_extra_info)),
            config,
            running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicUsize::new(0)),
            thread: Mutex::new(None),
        }
    }

    /// Starts the pump thread and installs the hooks.
    ///
    /// Blocks only until the hooks are installed, and returns the installation
    /// error if that fails. Calling this while already running does nothing.
    pub fn start(&self) -> Result<()> {
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();

        loop {
            let mut slot = self.lock_thread();
            if self.running.load(Ordering::SeqCst) {
                return Ok(());
            }

            // A thread from an earlier run may still be winding down. Its
            // handlers may call back into this listener, so it is joined
            // with the lock released.
            if let Some(previous) = slot.take() {
                drop(slot);
                join_unless_current(previous);
                continue;
            }

            self.running.store(true, Ordering::SeqCst);
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            match self.spawn_pump(generation, ready_tx) {
                Ok(handle) => *slot = Some(handle),
                Err(e) => {
                    self.running.store(false, Ordering::SeqCst);
                    return Err(Error::ThreadSpawn(e));
                }
            }
            break;
        }

        let failure = match ready_rx.recv() {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e,
            Err(_) => Error::HookThreadCrashed,
        };

        self.running.store(false, Ordering::SeqCst);
        let _ = self.join();
        Err(failure)
    }

    fn spawn_pump(
        &self,
        generation: usize,
        ready_tx: oneshot::Sender<Result<()>>,
    ) -> std::io::Result<thread::JoinHandle<()>> {
        let backend = Arc::clone(&self.backend);
        let dispatcher = Arc::clone(&self.dispatcher);
        let running = Arc::clone(&self.running);
        let current = Arc::clone(&self.generation);
        let poll_interval = self.config.poll_interval;

        thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || {
                let mut hooks = match backend.install(dispatcher) {
                    Err(e) => {
                        #[cfg(feature = "log")]
                        log::error!("failed to install input hooks: {}", e);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                    Ok(hooks) => {
                        let _ = ready_tx.send(Ok(()));
                        hooks
                    }
                };

                #[cfg(feature = "log")]
                log::debug!("pump thread started");

                // A restart from one of our own handlers starts a newer run,
                // which this thread must leave to.
                while running.load(Ordering::SeqCst)
                    && current.load(Ordering::SeqCst) == generation
                {
                    if !backend.pump(&mut hooks) {
                        thread::sleep(poll_interval);
                    }
                }

                drop(hooks);

                #[cfg(feature = "log")]
                log::debug!("pump thread stopped");
            })
    }

    /// Asks the pump thread to uninstall the hooks and exit.
    ///
    /// The thread notices within one poll interval. This does not wait for it;
    /// use [`HookListener::join`] for that. Calling this when not running
    /// does nothing.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Waits for the pump thread to exit.
    ///
    /// Returns immediately when no thread exists or when called from the pump
    /// thread itself. Blocks indefinitely if the listener has not been stopped.
    pub fn join(&self) -> thread::Result<()> {
        let handle = self.lock_thread().take();
        match handle {
            Some(handle) if handle.thread().id() == thread::current().id() => {
                *self.lock_thread() = Some(handle);
                Ok(())
            }
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn lock_thread(&self) -> MutexGuard<'_, Option<thread::JoinHandle<()>>> {
        self.thread.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a handler for a category named `keydown`, `keyup`,
    /// `mousedown` or `mouseup`.
    ///
    /// The handler's return value decides propagation: `true` or
    /// [`Propagation::Suppress`] swallows the event, anything else passes it on.
    pub fn add_handler<F, R>(&self, category: &str, handler: F) -> Result<()>
    where
        F: Fn(&Event) -> R + Send + Sync + 'static,
        R: Into<Propagation>,
    {
        let category = category.parse::<Category>()?;
        self.dispatcher.add(category, handler);
        Ok(())
    }

    pub fn on_key_down<F, R>(&self, handler: F)
    where
        F: Fn(&KeyEvent) -> R + Send + Sync + 'static,
        R: Into<Propagation>,
    {
        self.add_key_handler(Category::KeyDown, handler);
    }

    pub fn on_key_up<F, R>(&self, handler: F)
    where
        F: Fn(&KeyEvent) -> R + Send + Sync + 'static,
        R: Into<Propagation>,
    {
        self.add_key_handler(Category::KeyUp, handler);
    }

    pub fn on_mouse_down<F, R>(&self, handler: F)
    where
        F: Fn(&MouseEvent) -> R + Send + Sync + 'static,
        R: Into<Propagation>,
    {
        self.add_mouse_handler(Category::MouseDown, handler);
    }

    pub fn on_mouse_up<F, R>(&self, handler: F)
    where
        F: Fn(&MouseEvent) -> R + Send + Sync + 'static,
        R: Into<Propagation>,
    {
        self.add_mouse_handler(Category::MouseUp, handler);
    }

    fn add_key_handler<F, R>(&self, category: Category, handler: F)
    where
        F: Fn(&KeyEvent) -> R + Send + Sync + 'static,
        R: Into<Propagation>,
    {
        self.dispatcher
            .add(category, move |event: &Event| -> Propagation {
                match event.as_key() {
                    Some(key) => handler(key).into(),
                    None => Propagation::Pass,
                }
            });
    }

    fn add_mouse_handler<F, R>(&self, category: Category, handler: F)
    where
        F: Fn(&MouseEvent) -> R + Send + Sync + 'static,
        R: Into<Propagation>,
    {
        self.dispatcher
            .add(category, move |event: &Event| -> Propagation {
                match event.as_mouse() {
                    Some(mouse) => handler(mouse).into(),
                    None => Propagation::Pass,
                }
            });
    }

    /// The handler table shared with the pump thread.
    ///
    /// Events obtained elsewhere can be replayed through
    /// [`Dispatcher::dispatch`].
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Returns the current cursor position. Works whether or not the listener
    /// is running.
    pub fn get_mouse_position(&self) -> Result<(i32, i32)> {
        self.backend.cursor_position()
    }
}

impl<B: Backend> Drop for HookListener<B> {
    fn drop(&mut self) {
        self.stop();
        let _ = self.join();
    }
}

fn join_unless_current(handle: thread::JoinHandle<()>) {
    if handle.thread().id() != thread::current().id() {
        let _ = handle.join();
    }
}

//! Multi-key hotkey chords on top of the hook engine's keyboard stream.
//!
//! A chord fires when all of its keys are down and the first of them was
//! pressed no more than the configured timeout ago. It then stays consumed,
//! and will not fire again, until one of its keys is released.
//!
//! [`ChordMatcher`] is the clock-injected state machine and can be driven by
//! any key source. [`HotkeyListener`] feeds it from a private
//! [`HookListener`].

use std::{
    collections::{HashMap, HashSet},
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
    time::{Duration, Instant},
};

use crate::{
    error::{Error, Result},
    event::KeyEvent,
    hook::{self, Backend, Dispatcher, HookListener},
    platform::DefaultBackend,
};

/// A hotkey action. Runs on the pump thread, so it should return quickly.
pub type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Where a hotkey is in its press cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordState {
    /// Waiting for all keys to be down within the timeout.
    Idle,
    /// Fired; waiting for one of its keys to be released.
    Consumed,
}

struct Hotkey {
    name: Arc<str>,
    keys: Vec<&'static str>,
    callback: Callback,
    state: ChordState,
    /// Keys whose current press is too old to count for this chord.
    stale: HashSet<&'static str>,
}

impl Hotkey {
    /// Whether a press or release of `key` concerns this chord. A generic
    /// modifier is concerned by either of its sides.
    fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|&k| {
            k == key
                || crate::keys::sides(k).is_some_and(|sides| sides.iter().any(|s| *s == key))
        })
    }

    /// Returns the earliest press among the chord's keys, naming the key that
    /// was physically pressed, or `None` if some key is up or stale.
    fn first_press(
        &self,
        pressed: &HashMap<String, Instant>,
    ) -> Option<(&'static str, Instant)> {
        let mut first: Option<(&'static str, Instant)> = None;
        for &key in &self.keys {
            let (held, at) = self.press_of(key, pressed)?;
            match first {
                Some((_, earliest)) if earliest <= at => {}
                _ => first = Some((held, at)),
            }
        }
        first
    }

    /// The earliest live press that holds `key` down.
    fn press_of(
        &self,
        key: &'static str,
        pressed: &HashMap<String, Instant>,
    ) -> Option<(&'static str, Instant)> {
        let sides = crate::keys::sides(key);
        let candidates: &[&'static str] = match &sides {
            Some(sides) => sides,
            None => std::slice::from_ref(&key),
        };
        candidates
            .iter()
            .copied()
            .filter(|k| !self.stale.contains(k))
            .filter_map(|k| pressed.get(k).map(|&at| (k, at)))
            .min_by_key(|&(_, at)| at)
    }
}

/// A hotkey that has just been satisfied.
#[derive(Clone)]
pub struct Trigger {
    name: Arc<str>,
    callback: Callback,
}

impl Trigger {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the callback. A panic is logged and swallowed.
    pub fn fire(&self) {
        #[cfg(feature = "log")]
        log::info!("hotkey `{}` fired", self.name);

        if let Err(_payload) = panic::catch_unwind(AssertUnwindSafe(|| (self.callback)())) {
            #[cfg(feature = "log")]
            log::error!(
                "hotkey `{}` callback panicked: {}",
                self.name,
                hook::panic_message(&*_payload)
            );
        }
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger").field("name", &self.name).finish()
    }
}

/// Pressed-key bookkeeping and chord matching.
pub struct ChordMatcher {
    timeout: Duration,
    pressed: HashMap<String, Instant>,
    hotkeys: Vec<Hotkey>,
}

impl ChordMatcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pressed: HashMap::new(),
            hotkeys: Vec::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Registers a chord.
    ///
    /// Key names are resolved through the vocabulary and duplicates collapse
    /// to their first occurrence. `Ctrl`, `Shift` and `Alt` are held when
    /// either side is.
    ///
    /// Fails with [`Error::UnknownKey`] for an unknown name,
    /// [`Error::NotAKeyboardKey`] for a mouse button and [`Error::EmptyChord`]
    /// when `keys` is empty.
    pub fn register<I, K, F>(&mut self, name: &str, keys: I, callback: F) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
        F: Fn() + Send + Sync + 'static,
    {
        let mut chord: Vec<&'static str> = Vec::new();
        for key in keys {
            let canonical = crate::keys::canonical_name(key.as_ref())?;
            if crate::keys::is_mouse_button(canonical) {
                return Err(Error::NotAKeyboardKey(canonical.to_owned()));
            }
            if !chord.contains(&canonical) {
                chord.push(canonical);
            }
        }
        if chord.is_empty() {
            return Err(Error::EmptyChord(name.to_owned()));
        }

        #[cfg(feature = "log")]
        log::debug!("registered hotkey `{}`: {}", name, chord.join("+"));

        self.hotkeys.push(Hotkey {
            name: Arc::from(name),
            keys: chord,
            callback: Arc::new(callback),
            state: ChordState::Idle,
            stale: HashSet::new(),
        });
        Ok(())
    }

    /// Records a key press at `now` and returns the hotkeys it completes, in
    /// registration order. The caller fires them.
    ///
    /// A key that is already down keeps the time of its first press, so
    /// auto-repeat does not stretch the timeout.
    pub fn key_down(&mut self, key: &str, now: Instant) -> Vec<Trigger> {
        let fresh = !self.pressed.contains_key(key);
        if fresh {
            self.pressed.insert(key.to_owned(), now);
        }

        let mut triggers = Vec::new();
        for hotkey in self.hotkeys.iter_mut() {
            // A fresh press brings the key back into consideration.
            if fresh {
                hotkey.stale.remove(key);
            }

            if hotkey.state == ChordState::Consumed {
                continue;
            }
            let Some((first_key, first_at)) = hotkey.first_press(&self.pressed) else {
                continue;
            };

            if now.saturating_duration_since(first_at) <= self.timeout {
                hotkey.state = ChordState::Consumed;
                triggers.push(Trigger {
                    name: Arc::clone(&hotkey.name),
                    callback: Arc::clone(&hotkey.callback),
                });
            } else {
                #[cfg(feature = "log")]
                log::debug!(
                    "hotkey `{}` expired, `{}` was pressed too early",
                    hotkey.name,
                    first_key
                );
                hotkey.stale.insert(first_key);
            }
        }
        triggers
    }

    /// Records a key release, re-arming every hotkey that contains the key.
    pub fn key_up(&mut self, key: &str) {
        self.pressed.remove(key);
        for hotkey in self.hotkeys.iter_mut().filter(|h| h.contains(key)) {
            hotkey.state = ChordState::Idle;
            hotkey.stale.remove(key);
        }
    }

    /// Forgets all pressed keys and re-arms every hotkey.
    pub fn clear(&mut self) {
        self.pressed.clear();
        for hotkey in self.hotkeys.iter_mut() {
            hotkey.state = ChordState::Idle;
            hotkey.stale.clear();
        }
    }

    /// Names of the keys currently held down.
    pub fn pressed_keys(&self) -> HashSet<String> {
        self.pressed.keys().cloned().collect()
    }

    pub fn is_pressed(&self, key: &str) -> bool {
        self.pressed.contains_key(key)
    }

    /// Each hotkey's name and state, in registration order.
    pub fn states(&self) -> Vec<(Arc<str>, ChordState)> {
        self.hotkeys
            .iter()
            .map(|h| (Arc::clone(&h.name), h.state))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.hotkeys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hotkeys.is_empty()
    }
}

/// Configuration for a [`HotkeyListener`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Longest time between the first key of a chord going down and the
    /// chord being complete.
    pub timeout: Duration,
    /// Configuration of the underlying hook.
    pub hook: hook::Config,
}

impl Config {
    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn set_hook_config(mut self, hook: hook::Config) -> Self {
        self.hook = hook;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            hook: hook::Config::default(),
        }
    }
}

/// Recognises registered hotkey chords system-wide.
///
/// Callbacks run on the hook's pump thread. Keep them short and move real
/// work to another thread, or subsequent input will be delayed.
pub struct HotkeyListener<B: Backend = DefaultBackend> {
    hook: HookListener<B>,
    matcher: Arc<Mutex<ChordMatcher>>,
}

impl HotkeyListener<DefaultBackend> {
    pub fn new(config: Config) -> Self {
        Self::with_backend(DefaultBackend::default(), config)
    }
}

impl Default for HotkeyListener<DefaultBackend> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<B: Backend> HotkeyListener<B> {
    pub fn with_backend(backend: B, config: Config) -> Self {
        let hook = HookListener::with_backend(backend, config.hook);
        let matcher = Arc::new(Mutex::new(ChordMatcher::new(config.timeout)));

        let m = Arc::clone(&matcher);
        hook.on_key_down(move |event: &KeyEvent| {
            let triggers = lock(&m).key_down(event.key_name(), Instant::now());
            for trigger in &triggers {
                trigger.fire();
            }
        });

        let m = Arc::clone(&matcher);
        hook.on_key_up(move |event: &KeyEvent| {
            lock(&m).key_up(event.key_name());
        });

        Self { hook, matcher }
    }

    /// Registers a hotkey. See [`ChordMatcher::register`].
    pub fn register_hotkey<I, K, F>(&self, name: &str, keys: I, callback: F) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
        F: Fn() + Send + Sync + 'static,
    {
        lock(&self.matcher).register(name, keys, callback)
    }

    /// Starts the hook with no keys considered pressed.
    pub fn start(&self) -> Result<()> {
        if !self.hook.is_running() {
            // The last run may have pumped events after stop() cleared the
            // matcher. Wait for it to finish before clearing again.
            let _ = self.hook.join();
            lock(&self.matcher).clear();
        }
        self.hook.start()
    }

    /// Stops the hook and forgets all pressed keys.
    pub fn stop(&self) {
        self.hook.stop();
        lock(&self.matcher).clear();
    }

    pub fn join(&self) -> thread::Result<()> {
        self.hook.join()
    }

    pub fn is_running(&self) -> bool {
        self.hook.is_running()
    }

    pub fn pressed_keys(&self) -> HashSet<String> {
        lock(&self.matcher).pressed_keys()
    }

    /// The keyboard dispatcher feeding the matcher, for replaying events.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        self.hook.dispatcher()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn names(triggers: &[Trigger]) -> Vec<&str> {
        triggers.iter().map(Trigger::name).collect()
    }

    #[test]
    fn chord_within_timeout_fires_once() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        let (count, callback) = counter();
        matcher.register("ab", ["A", "B"], callback).unwrap();

        let t0 = Instant::now();
        assert!(matcher.key_down("A", t0).is_empty());
        let triggers = matcher.key_down("B", t0 + ms(500));
        assert_eq!(names(&triggers), ["ab"]);
        triggers.iter().for_each(Trigger::fire);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(matcher.states()[0].1, ChordState::Consumed);
    }

    #[test]
    fn chord_exactly_at_timeout_fires() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        matcher.register("ab", ["A", "B"], || {}).unwrap();

        let t0 = Instant::now();
        matcher.key_down("A", t0);
        assert_eq!(matcher.key_down("B", t0 + TIMEOUT).len(), 1);
    }

    #[test]
    fn chord_past_timeout_does_not_fire() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        matcher.register("ab", ["A", "B"], || {}).unwrap();

        let t0 = Instant::now();
        matcher.key_down("A", t0);
        assert!(matcher.key_down("B", t0 + ms(2100)).is_empty());
        assert_eq!(matcher.states()[0].1, ChordState::Idle);

        // Other presses while the stale key is held do not revive the chord.
        assert!(matcher.key_down("C", t0 + ms(2200)).is_empty());
        assert!(matcher.key_down("B", t0 + ms(2300)).is_empty());
    }

    #[test]
    fn expired_chord_fires_after_fresh_press_of_stale_key() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        matcher.register("ab", ["A", "B"], || {}).unwrap();

        let t0 = Instant::now();
        matcher.key_down("A", t0);
        assert!(matcher.key_down("B", t0 + ms(2100)).is_empty());

        matcher.key_up("A");
        let triggers = matcher.key_down("A", t0 + ms(2200));
        assert_eq!(names(&triggers), ["ab"]);
    }

    #[test]
    fn held_chord_does_not_refire_until_release() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        matcher.register("ab", ["A", "B"], || {}).unwrap();

        let t0 = Instant::now();
        matcher.key_down("A", t0);
        assert_eq!(matcher.key_down("B", t0 + ms(100)).len(), 1);

        // Auto-repeat and unrelated keys while held.
        assert!(matcher.key_down("B", t0 + ms(600)).is_empty());
        assert!(matcher.key_down("A", t0 + ms(700)).is_empty());
        assert!(matcher.key_down("C", t0 + ms(800)).is_empty());

        matcher.key_up("A");
        assert_eq!(matcher.states()[0].1, ChordState::Idle);
        let triggers = matcher.key_down("A", t0 + ms(900));
        assert_eq!(names(&triggers), ["ab"]);
    }

    #[test]
    fn auto_repeat_does_not_refresh_the_first_press() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        matcher.register("ab", ["A", "B"], || {}).unwrap();

        let t0 = Instant::now();
        matcher.key_down("A", t0);
        for i in 1..=20 {
            assert!(matcher.key_down("A", t0 + ms(100 * i)).is_empty());
        }
        assert!(matcher.key_down("B", t0 + ms(2100)).is_empty());

        // Repeats of the stale key do not revive the chord either.
        assert!(matcher.key_down("A", t0 + ms(2200)).is_empty());

        matcher.key_up("A");
        assert_eq!(matcher.key_down("A", t0 + ms(2300)).len(), 1);
    }

    #[test]
    fn generic_modifier_matches_either_side() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        let (count, callback) = counter();
        matcher.register("save", ["Control", "S"], callback).unwrap();
        assert_eq!(matcher.hotkeys[0].keys, ["Ctrl", "S"]);

        let t0 = Instant::now();
        matcher.key_down("Lctrl", t0);
        let triggers = matcher.key_down("S", t0 + ms(100));
        assert_eq!(names(&triggers), ["save"]);
        triggers.iter().for_each(Trigger::fire);

        // Releasing the side re-arms the chord.
        matcher.key_up("Lctrl");
        matcher.key_up("S");
        assert_eq!(matcher.states()[0].1, ChordState::Idle);

        matcher.key_down("Rctrl", t0 + ms(500));
        for trigger in matcher.key_down("S", t0 + ms(600)) {
            trigger.fire();
        }
        assert_eq!(count.load(Ordering::SeqCst), 2);

        let want: HashSet<String> = ["Rctrl", "S"].map(String::from).into();
        assert_eq!(matcher.pressed_keys(), want);
    }

    #[test]
    fn generic_modifier_expires_per_side() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        matcher.register("find", ["Ctrl", "F"], || {}).unwrap();

        let t0 = Instant::now();
        matcher.key_down("Lctrl", t0);
        assert!(matcher.key_down("F", t0 + ms(2100)).is_empty());

        // The other side, pressed fresh, satisfies the chord.
        matcher.key_up("F");
        matcher.key_down("Rctrl", t0 + ms(2200));
        assert_eq!(matcher.key_down("F", t0 + ms(2300)).len(), 1);
    }

    #[test]
    fn mouse_buttons_cannot_be_chorded() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        for button in ["MouseLeft", "LButton", "XButton1"] {
            let err = matcher.register("click", [button, "A"], || {}).unwrap_err();
            assert!(matches!(&err, Error::NotAKeyboardKey(_)), "{button}");
            assert!(err.is_configuration());
        }
        assert!(matcher.is_empty());
    }

    #[test]
    fn overlapping_chords_fire_in_order() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        let (ab_count, ab) = counter();
        let (abc_count, abc) = counter();
        matcher.register("ab", ["A", "B"], ab).unwrap();
        matcher.register("abc", ["A", "B", "C"], abc).unwrap();

        let t0 = Instant::now();
        let mut fired = Vec::new();
        for (i, key) in ["A", "B", "C"].into_iter().enumerate() {
            for trigger in matcher.key_down(key, t0 + ms(100 * i as u64)) {
                fired.push(trigger.name().to_owned());
                trigger.fire();
            }
        }

        assert_eq!(fired, ["ab", "abc"]);
        assert_eq!(ab_count.load(Ordering::SeqCst), 1);
        assert_eq!(abc_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn simultaneously_satisfied_chords_fire_in_registration_order() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        matcher.register("second", ["Lctrl", "S"], || {}).unwrap();
        matcher.register("first", ["S", "Lctrl"], || {}).unwrap();

        let t0 = Instant::now();
        matcher.key_down("Lctrl", t0);
        let triggers = matcher.key_down("S", t0 + ms(50));
        assert_eq!(names(&triggers), ["second", "first"]);
    }

    #[test]
    fn pressed_state_follows_last_event_per_key() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        let t0 = Instant::now();
        let sequence = [
            ("A", true),
            ("B", true),
            ("A", false),
            ("C", true),
            ("B", false),
            ("B", true),
            ("C", true),
            ("D", false),
            ("E", true),
            ("E", false),
        ];

        let mut expected: HashMap<&str, bool> = HashMap::new();
        for (i, &(key, down)) in sequence.iter().enumerate() {
            if down {
                matcher.key_down(key, t0 + ms(i as u64));
            } else {
                matcher.key_up(key);
            }
            expected.insert(key, down);

            let want: HashSet<String> = expected
                .iter()
                .filter(|&(_, &down)| down)
                .map(|(&key, _)| key.to_owned())
                .collect();
            assert_eq!(matcher.pressed_keys(), want, "after step {i}");
        }
    }

    #[test]
    fn registration_validates_keys() {
        let mut matcher = ChordMatcher::new(TIMEOUT);

        let err = matcher
            .register("empty", Vec::<&str>::new(), || {})
            .unwrap_err();
        assert!(matches!(&err, Error::EmptyChord(name) if name == "empty"));
        assert!(err.is_configuration());

        let err = matcher.register("bad", ["Lctrl", "Hyper"], || {}).unwrap_err();
        assert!(matches!(&err, Error::UnknownKey(name) if name == "Hyper"));

        assert!(matcher.is_empty());
    }

    #[test]
    fn registration_canonicalises_and_dedups_names() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        matcher
            .register("save", ["lctrl", "s", "LCTRL"], || {})
            .unwrap();
        assert_eq!(matcher.hotkeys[0].keys, ["Lctrl", "S"]);

        let t0 = Instant::now();
        matcher.key_down("Lctrl", t0);
        assert_eq!(matcher.key_down("S", t0 + ms(10)).len(), 1);
    }

    #[test]
    fn single_key_chord() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        matcher.register("f9", ["F9"], || {}).unwrap();

        let t0 = Instant::now();
        assert_eq!(matcher.key_down("F9", t0).len(), 1);
        assert!(matcher.key_down("F9", t0 + ms(30)).is_empty());
        matcher.key_up("F9");
        assert_eq!(matcher.key_down("F9", t0 + ms(60)).len(), 1);
    }

    #[test]
    fn clear_forgets_pressed_keys() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        matcher.register("ab", ["A", "B"], || {}).unwrap();

        let t0 = Instant::now();
        matcher.key_down("A", t0);
        matcher.key_down("B", t0 + ms(10));
        matcher.clear();

        assert!(matcher.pressed_keys().is_empty());
        assert_eq!(matcher.states()[0].1, ChordState::Idle);
        assert!(matcher.key_down("B", t0 + ms(20)).is_empty());
    }

    #[test]
    fn panicking_callback_does_not_stop_others() {
        let mut matcher = ChordMatcher::new(TIMEOUT);
        let (count, callback) = counter();
        matcher.register("bad", ["A"], || panic!("callback failed")).unwrap();
        matcher.register("good", ["A"], callback).unwrap();

        for trigger in matcher.key_down("A", Instant::now()) {
            trigger.fire();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.timeout, Duration::from_secs(2));
        let config = config.set_timeout(ms(500));
        assert_eq!(config.timeout, ms(500));
    }
}

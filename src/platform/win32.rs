use std::{cell::RefCell, sync::Arc};

use windows::{
    Win32::{
        Foundation::{LPARAM, LRESULT, POINT, WPARAM},
        System::LibraryLoader::GetModuleHandleW,
        UI::WindowsAndMessaging::{
            CallNextHookEx, DispatchMessageW, GetCursorPos, HC_ACTION, HHOOK, HOOKPROC,
            KBDLLHOOKSTRUCT, MSG, MSLLHOOKSTRUCT, PM_REMOVE, PeekMessageW, SetWindowsHookExW,
            TranslateMessage, WH_KEYBOARD_LL, WH_MOUSE_LL, WINDOWS_HOOK_ID, WM_KEYDOWN,
            WM_KEYUP, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP,
            WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SYSKEYDOWN, WM_SYSKEYUP, WM_XBUTTONDOWN,
            WM_XBUTTONUP,
        },
    },
    core::Owned,
};

use crate::{
    error::{Error, HookKind, Result},
    event::{Event, KeyAction, KeyEvent, MouseAction, MouseButton, MouseEvent},
    hook::{Backend, Dispatcher, Propagation},
};

const LLKHF_INJECTED: u32 = 0x10;
const LLMHF_INJECTED: u32 = 0x01;
const XBUTTON1: u32 = 0x0001;

thread_local! {
    // The dispatcher of the engine whose pump thread this is.
    static DISPATCHER: RefCell<Option<Arc<Dispatcher>>> = const { RefCell::new(None) };
}

/// Windows low-level hooks (`WH_KEYBOARD_LL` and `WH_MOUSE_LL`).
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsBackend;

/// The installed hook pair. Dropping it unhooks both.
pub struct Hooks {
    _keyboard: Owned<HHOOK>,
    _mouse: Owned<HHOOK>,
    msg: MSG,
}

impl Drop for Hooks {
    fn drop(&mut self) {
        DISPATCHER.with(|d| d.borrow_mut().take());

        #[cfg(feature = "log")]
        log::info!("unregistering keyboard and mouse hooks");
    }
}

impl Backend for WindowsBackend {
    type Hooks = Hooks;

    fn install(&self, dispatcher: Arc<Dispatcher>) -> Result<Hooks> {
        DISPATCHER.with(|d| *d.borrow_mut() = Some(dispatcher));

        let keyboard = unsafe { register_hook(WH_KEYBOARD_LL, Some(low_level_keyboard_proc)) }
            .map_err(|source| Error::HookRegistrationFailed {
                kind: HookKind::Keyboard,
                source,
            });
        let keyboard = match keyboard {
            Ok(hook) => hook,
            Err(e) => {
                DISPATCHER.with(|d| d.borrow_mut().take());
                return Err(e);
            }
        };

        let mouse = unsafe { register_hook(WH_MOUSE_LL, Some(low_level_mouse_proc)) }.map_err(
            |source| Error::HookRegistrationFailed {
                kind: HookKind::Mouse,
                source,
            },
        );
        let mouse = match mouse {
            Ok(hook) => hook,
            Err(e) => {
                DISPATCHER.with(|d| d.borrow_mut().take());
                return Err(e);
            }
        };

        #[cfg(feature = "log")]
        log::info!("registered keyboard and mouse hooks");

        Ok(Hooks {
            _keyboard: keyboard,
            _mouse: mouse,
            msg: MSG::default(),
        })
    }

    fn pump(&self, hooks: &mut Hooks) -> bool {
        unsafe {
            if PeekMessageW(&mut hooks.msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&hooks.msg);
                DispatchMessageW(&hooks.msg);
                true
            } else {
                false
            }
        }
    }

    fn cursor_position(&self) -> Result<(i32, i32)> {
        let mut point = POINT::default();
        unsafe { GetCursorPos(&mut point) }.map_err(|e| Error::CursorPosition(e.into()))?;
        Ok((point.x, point.y))
    }
}

unsafe fn register_hook(id: WINDOWS_HOOK_ID, f: HOOKPROC) -> std::io::Result<Owned<HHOOK>> {
    let module = unsafe { GetModuleHandleW(None) }?;
    let hook = unsafe { SetWindowsHookExW(id, f, Some(module.into()), 0) }?;

    Ok(unsafe { Owned::new(hook) })
}

fn dispatch(event: Event) -> Propagation {
    let dispatcher = DISPATCHER.with(|d| d.borrow().clone());
    match dispatcher {
        Some(dispatcher) => dispatcher.dispatch(&event),
        None => Propagation::Pass,
    }
}

unsafe extern "system" fn low_level_keyboard_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        if let Some(event) = unsafe { key_event_from_params(w_param, l_param) } {
            if dispatch(Event::Key(event)).is_suppressed() {
                return LRESULT(1);
            }
        }
    }

    unsafe { CallNextHookEx(None, n_code, w_param, l_param) }
}

unsafe extern "system" fn low_level_mouse_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        if let Some(event) = unsafe { mouse_event_from_params(w_param, l_param) } {
            if dispatch(Event::Mouse(event)).is_suppressed() {
                return LRESULT(1);
            }
        }
    }

    unsafe { CallNextHookEx(None, n_code, w_param, l_param) }
}

/// Builds a [`KeyEvent`] inside the keyboard hook procedure.
///
/// # Safety
/// `l_param` must be a valid pointer to a `KBDLLHOOKSTRUCT`.
unsafe fn key_event_from_params(w_param: WPARAM, l_param: LPARAM) -> Option<KeyEvent> {
    let kbd = unsafe { *(l_param.0 as *const KBDLLHOOKSTRUCT) };
    let action = match w_param.0 as u32 {
        WM_KEYDOWN | WM_SYSKEYDOWN => KeyAction::KeyDown,
        WM_KEYUP | WM_SYSKEYUP => KeyAction::KeyUp,
        _ => return None,
    };

    Some(
        KeyEvent::new(action, kbd.vkCode)
            .with_scan_code(kbd.scanCode)
            .with_injected(kbd.flags.0 & LLKHF_INJECTED != 0)
            .with_extra_info(kbd.dwExtraInfo),
    )
}

/// Builds a [`MouseEvent`] inside the mouse hook procedure. Moves and wheel
/// notifications yield `None`.
///
/// # Safety
/// `l_param` must be a valid pointer to a `MSLLHOOKSTRUCT`.
unsafe fn mouse_event_from_params(w_param: WPARAM, l_param: LPARAM) -> Option<MouseEvent> {
    let ms = unsafe { *(l_param.0 as *const MSLLHOOKSTRUCT) };
    let (action, button) = match w_param.0 as u32 {
        WM_LBUTTONDOWN => (MouseAction::MouseDown, MouseButton::Left),
        WM_LBUTTONUP => (MouseAction::MouseUp, MouseButton::Left),
        WM_RBUTTONDOWN => (MouseAction::MouseDown, MouseButton::Right),
        WM_RBUTTONUP => (MouseAction::MouseUp, MouseButton::Right),
        WM_MBUTTONDOWN => (MouseAction::MouseDown, MouseButton::Middle),
        WM_MBUTTONUP => (MouseAction::MouseUp, MouseButton::Middle),
        message @ (WM_XBUTTONDOWN | WM_XBUTTONUP) => {
            let button = if (ms.mouseData >> 16) & 0xFFFF == XBUTTON1 {
                MouseButton::XButton1
            } else {
                MouseButton::XButton2
            };
            let action = if message == WM_XBUTTONDOWN {
                MouseAction::MouseDown
            } else {
                MouseAction::MouseUp
            };
            (action, button)
        }
        _ => return None,
    };

    Some(
        MouseEvent::new(action, button, (ms.pt.x, ms.pt.y))
            .with_injected(ms.flags & LLMHF_INJECTED != 0)
            .with_extra_info(ms.dwExtraInfo),
    )
}

use std::{sync::mpsc, time::Duration};

use inputhook::{HotkeyListener, hotkey::Config};

fn main() {
    #[cfg(feature = "log")]
    colog::init();

    let hotkeys = HotkeyListener::new(Config::default().set_timeout(Duration::from_secs(2)));

    // Callbacks run on the hook thread, so hand the work to the main thread.
    let (tx, rx) = mpsc::channel::<&'static str>();
    for (name, keys) in [
        ("save", &["Lctrl", "S"][..]),
        ("find", &["Ctrl", "F"][..]),
        ("save as", &["Lctrl", "Lshift", "S"][..]),
        ("delete", &["Lshift", "Delete"][..]),
    ] {
        let tx = tx.clone();
        hotkeys
            .register_hotkey(name, keys, move || {
                let _ = tx.send(name);
            })
            .unwrap();
    }

    hotkeys.start().unwrap();

    while let Ok(name) = rx.recv_timeout(Duration::from_secs(60)) {
        println!("{name} triggered");
    }

    hotkeys.stop();
    hotkeys.join().unwrap();
}

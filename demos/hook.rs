use std::{thread, time::Duration};

use inputhook::{HookListener, KeyEvent, MouseEvent};

fn main() {
    #[cfg(feature = "log")]
    colog::init();

    let listener = HookListener::default();
    listener.on_key_down(|event: &KeyEvent| println!("keydown {}", event.key_name()));
    listener.on_key_up(|event: &KeyEvent| println!("keyup {}", event.key_name()));
    listener.on_mouse_down(|event: &MouseEvent| {
        println!("mousedown {} {:?}", event.button(), event.position())
    });
    listener.on_mouse_up(|event: &MouseEvent| {
        println!("mouseup {} {:?}", event.button(), event.position())
    });

    // Swallow F13 so no other application ever sees it.
    listener.on_key_down(|event: &KeyEvent| event.key_name() == "F13");

    listener.start().unwrap();

    println!("cursor at {:?}", listener.get_mouse_position().unwrap());

    // your main code ...
    loop {
        thread::sleep(Duration::from_secs(10))
    }
}

//! Dedicated OS-thread key listener using `rdev::listen`.
//!
//! `rdev::listen` blocks forever and has no shutdown call, so it lives on
//! its own thread.  Dropping the [`ShutterListener`] sets a stop flag and the
//! callback ignores every later event; the thread itself stays parked in
//! rdev until the process exits.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::ShutterMonitor;

pub struct ShutterListener {
    stop: Arc<AtomicBool>,
    /// Never joined: `rdev::listen` does not return.
    _thread: std::thread::JoinHandle<()>,
}

impl ShutterListener {
    /// Watch `key` and feed its press/release edges to `monitor`.
    ///
    /// The callback runs on the listener thread, so `monitor` must return
    /// promptly; it only classifies and spawns.
    pub fn start(key: rdev::Key, monitor: Arc<ShutterMonitor>) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("shutter-listener".into())
            .spawn(move || {
                log::info!("shutter: listening for {key:?}");
                let result = rdev::listen(move |event| {
                    if stop_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    match event.event_type {
                        rdev::EventType::KeyPress(k) if k == key => monitor.on_edge_down(),
                        rdev::EventType::KeyRelease(k) if k == key => {
                            let outcome = monitor.on_edge_up();
                            log::debug!("shutter: press → {outcome:?}");
                        }
                        _ => {}
                    }
                });

                if let Err(e) = result {
                    log::error!("shutter: key listener exited: {e:?}");
                }
            })?;

        Ok(Self {
            stop,
            _thread: thread,
        })
    }
}

impl Drop for ShutterListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

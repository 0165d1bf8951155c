use std::io::{self, Stdout, stdout};
use std::panic;
use std::sync::OnceLock;
use std::thread::{self, ThreadId};

use crossterm::{
    ExecutableCommand,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::error;
use ratatui::{Terminal, backend::CrosstermBackend};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

pub fn init() -> io::Result<Tui> {
    stdout().execute(EnterAlternateScreen)?;
    enable_raw_mode()?;
    Terminal::new(CrosstermBackend::new(stdout()))
}

pub fn restore() -> io::Result<()> {
    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

static UI_THREAD: OnceLock<ThreadId> = OnceLock::new();

/// Logs every panic.
///
/// Must be called from the thread that draws. Panics inside a guarded frame
/// become the recovery screen, and panics on runtime worker threads only fail
/// their task, so both are just logged. A panic on the drawing thread outside
/// a guarded frame restores the terminal before the default hook prints it.
pub fn install_panic_hook() {
    UI_THREAD.get_or_init(|| thread::current().id());
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        error!("panic: {info}");
        if !owns_terminal() {
            return;
        }
        let _ = restore();
        default_hook(info);
    }));
}

thread_local! {
    static GUARDED: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

fn in_guarded_frame() -> bool {
    GUARDED.with(|flag| flag.get())
}

fn owns_terminal() -> bool {
    !in_guarded_frame() && UI_THREAD.get() == Some(&thread::current().id())
}

/// Runs `f` with panics caught, marking the frame so the panic hook leaves
/// the terminal alone. Returns the panic message on failure.
pub fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    GUARDED.with(|flag| flag.set(true));
    let outcome = panic::catch_unwind(panic::AssertUnwindSafe(f));
    GUARDED.with(|flag| flag.set(false));
    outcome.map_err(|payload| {
        payload
            .downcast_ref::<&str>()
            .map(|text| text.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| String::from("unknown panic"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_drawing_thread_restores_the_terminal() {
        let ui = *UI_THREAD.get_or_init(|| thread::current().id());
        assert_eq!(owns_terminal(), ui == thread::current().id());
        assert_eq!(guarded(owns_terminal), Ok(false));
        assert!(!thread::spawn(owns_terminal).join().unwrap());
    }

    #[test]
    fn guarded_reports_the_panic_message() {
        let caught = guarded(|| -> u8 { panic!("render exploded") });
        assert_eq!(caught, Err(String::from("render exploded")));
        assert_eq!(guarded(|| 7), Ok(7));
        assert!(!in_guarded_frame());
    }
}

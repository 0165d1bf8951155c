use std::path::Path;
use std::sync::Arc;

use agentdeck::app::{App, HTTP_MODE_WARNING};
use agentdeck::backend::{ApiClient, ClientSettings, TransportMode, TransportResolver};
use agentdeck::store::{LocalStorage, Store};
use agentdeck::ui::{self, Banner};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::TestBackend;

fn build_app(dir: &Path) -> App {
    let settings = ClientSettings::default();
    let resolver = Arc::new(TransportResolver::new(
        settings.backend.clone(),
        None,
        reqwest::Client::new(),
    ));
    let store = Arc::new(Store::new(LocalStorage::load(dir.join("storage.json"))));
    App::new(dir.to_path_buf(), settings, store, ApiClient::new(resolver))
}

fn screen_text(app: &App, width: u16, height: u16) -> String {
    let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
    terminal.draw(|frame| ui::render(frame, app)).unwrap();
    let buffer = terminal.backend().buffer();
    buffer
        .content
        .chunks(width as usize)
        .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn unreachable_backend_shows_a_banner_that_cannot_be_dismissed() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = build_app(dir.path());
    app.store.set_backend(TransportMode::Unreachable);

    let text = screen_text(&app, 100, 30);
    assert!(text.contains("Backend unreachable"), "{text}");
    assert_eq!(ui::banner_for(&app, &app.store.snapshot()), Some(Banner::Unreachable));

    app.handle_key(KeyEvent::new(KeyCode::F(4), KeyModifiers::NONE));
    assert!(screen_text(&app, 100, 30).contains("Backend unreachable"));
}

#[test]
fn http_mode_notice_stays_dismissed_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = build_app(dir.path());
    app.store
        .set_backend(TransportMode::Http(String::from("http://127.0.0.1:8000")));
    assert!(screen_text(&app, 100, 30).contains("Running in HTTP mode"));

    app.handle_key(KeyEvent::new(KeyCode::F(4), KeyModifiers::NONE));
    let text = screen_text(&app, 100, 30);
    assert!(!text.contains("Running in HTTP mode"), "{text}");
    assert!(app.store.is_dismissed(HTTP_MODE_WARNING));

    let restarted = build_app(dir.path());
    restarted
        .store
        .set_backend(TransportMode::Http(String::from("http://127.0.0.1:8000")));
    assert_eq!(ui::banner_for(&restarted, &restarted.store.snapshot()), None);
}

#[test]
fn native_backend_has_no_banner() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(dir.path());
    app.store.set_backend(TransportMode::Native);
    assert_eq!(ui::banner_for(&app, &app.store.snapshot()), None);
    let text = screen_text(&app, 100, 30);
    assert!(!text.contains("Backend unreachable"));
    assert!(!text.contains("Running in HTTP mode"));
}

#[test]
fn crash_renders_the_recovery_screen() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = build_app(dir.path());
    app.fatal = Some(String::from("index out of bounds"));

    let text = screen_text(&app, 100, 30);
    assert!(text.contains("Something went wrong"), "{text}");
    assert!(text.contains("index out of bounds"));

    app.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
    assert!(app.should_quit);
}

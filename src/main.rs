use std::time::Duration;

use agentdeck::app::App;
use agentdeck::event::Event;
use agentdeck::tui::{self, guarded};
use agentdeck::{logging, ui};
use anyhow::{Context, Result};
use crossterm::event::{Event as CrosstermEvent, EventStream};
use futures_util::StreamExt;
use log::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let workspace_root = std::env::current_dir().context("failed to read current directory")?;
    logging::init(&workspace_root)?;
    tui::install_panic_hook();
    info!("agentdeck starting in {}", workspace_root.display());

    let mut app = App::from_workspace(workspace_root)?;
    app.bootstrap();

    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;
    app.shutdown();
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut stream = EventStream::new();
    let mut interval = tokio::time::interval(Duration::from_millis(250));

    while !app.should_quit {
        let drawn = guarded(|| terminal.draw(|frame| ui::render(frame, app)).map(|_| ()));
        match drawn {
            Ok(result) => result?,
            Err(message) => {
                error!("render failed: {message}");
                app.fatal = Some(message);
                // The recovery screen renders without screen state.
                terminal.clear()?;
            }
        }

        let event = tokio::select! {
            _ = interval.tick() => Event::Tick,
            maybe_event = stream.next() => {
                match maybe_event {
                    Some(Ok(CrosstermEvent::Key(key))) => Event::Key(key),
                    Some(Ok(CrosstermEvent::Resize(_, _))) => Event::Resize,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) | None => break,
                }
            }
        };

        let handled = guarded(|| match event {
            Event::Tick => app.on_tick(),
            Event::Key(key) => app.handle_key(key),
            Event::Resize => {}
        });
        if let Err(message) = handled {
            error!("event handler failed: {message}");
            app.fatal = Some(message);
        }
    }
    Ok(())
}

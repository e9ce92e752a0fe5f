use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::App;
use crate::tui::AppEvent;

const WHEEL_ROWS: u16 = 3;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => edit(app, |c| c.insert_str(&text)),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }

    app.poll_replies().await;
    app.poll_backend().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys
    if ctrl {
        match key.code {
            KeyCode::Char('c') => app.should_quit = true,
            KeyCode::Char('b') => app.toggle_sidebar(),
            KeyCode::Char('t') => app.toggle_latest_thought(),
            // Ctrl+J covers terminals that report no modifier on Enter
            KeyCode::Enter | KeyCode::Char('j') => edit(app, |c| c.insert_newline()),
            KeyCode::Home => app.scroll.scroll_to_top(),
            KeyCode::End => app.scroll.scroll_to_bottom(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Enter => {
            if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) {
                edit(app, |c| c.insert_newline());
            } else {
                app.submit();
            }
        }
        KeyCode::Esc => app.stop(),

        // Transcript scrolling
        KeyCode::PageUp => {
            let rows = (app.scroll.viewport / 2).max(1);
            app.scroll.scroll_up(rows);
        }
        KeyCode::PageDown => {
            let rows = (app.scroll.viewport / 2).max(1);
            app.scroll.scroll_down(rows);
        }
        KeyCode::Up => app.scroll.scroll_up(1),
        KeyCode::Down => app.scroll.scroll_down(1),

        // Composer editing
        KeyCode::Backspace => edit(app, |c| c.backspace()),
        KeyCode::Delete => edit(app, |c| c.delete()),
        KeyCode::Left => app.session.composer_mut().move_left(),
        KeyCode::Right => app.session.composer_mut().move_right(),
        KeyCode::Home => app.session.composer_mut().move_home(),
        KeyCode::End => app.session.composer_mut().move_end(),
        KeyCode::Char(ch) => edit(app, |c| c.insert_char(ch)),
        _ => {}
    }
}

fn edit(app: &mut App, f: impl FnOnce(&mut ada_chat_core::Composer)) {
    f(app.session.composer_mut());
    app.refresh_composer_layout();
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    match mouse.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(_) => app.pointer_moved(x, y),
        MouseEventKind::Down(MouseButton::Left) => {
            app.pointer_moved(x, y);
            app.click(x, y);
        }
        MouseEventKind::ScrollUp if app.in_transcript(x, y) => app.scroll.scroll_up(WHEEL_ROWS),
        MouseEventKind::ScrollDown if app.in_transcript(x, y) => app.scroll.scroll_down(WHEEL_ROWS),
        _ => {}
    }
}

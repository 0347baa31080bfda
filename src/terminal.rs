// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based barcode scanner
//!
//! Renders the camera preview to the terminal using Unicode half-block
//! characters, with a scan target overlay while the detection loop runs.
//! Decoded and manually entered barcodes are collected in a log.

use crate::backends::camera::Frame;
use crate::config::Config;
use crate::constants::{get_resolution_label, timing, ui};
use crate::errors::AppResult;
use crate::manual_entry::ManualEntry;
use crate::scanner::{self, Platform, ScannerHandle, ScannerMessage, SessionPhase, SessionSnapshot};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};
use std::io::{self, stdout};
use std::sync::mpsc;
use tracing::{info, warn};

/// Where a logged barcode came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntrySource {
    Scanned,
    Manual,
}

/// Run the terminal scanner until the user quits
pub fn run(platform: Platform, config: Config) -> AppResult<()> {
    let runtime = tokio::runtime::Runtime::new()?;

    let (code_tx, code_rx) = mpsc::channel();
    let handle = {
        let _guard = runtime.enter();
        scanner::spawn(
            platform,
            config,
            Box::new(move |code| {
                if code_tx.send(code).is_err() {
                    warn!("Terminal UI gone, dropping scanned barcode");
                }
            }),
        )
    };

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &handle, &code_rx);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    runtime.block_on(handle.shutdown())?;
    result
}

/// UI state that lives outside the scanner session
struct TerminalApp {
    manual: Option<ManualEntry>,
    show_help: bool,
    log: Vec<(String, EntrySource)>,
    notice: Option<String>,
}

impl TerminalApp {
    fn new() -> Self {
        Self {
            manual: None,
            show_help: false,
            log: Vec::new(),
            notice: None,
        }
    }

    fn record(&mut self, code: String, source: EntrySource) {
        info!(code = %code, source = ?source, "Barcode logged");
        self.notice = Some(match source {
            EntrySource::Scanned => format!("Scanned {}", code),
            EntrySource::Manual => format!("Entered {}", code),
        });
        self.log.push((code, source));
    }
}

/// What a key press asks the loop to do
#[derive(Debug, PartialEq, Eq)]
enum KeyAction {
    None,
    Quit,
    Send(ScannerMessage),
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    handle: &ScannerHandle,
    codes: &mpsc::Receiver<String>,
) -> AppResult<()> {
    let preview = handle.preview();
    let mut app = TerminalApp::new();

    loop {
        while let Ok(code) = codes.try_recv() {
            app.record(code, EntrySource::Scanned);
        }

        let snapshot = handle.snapshot();
        let frame = preview.borrow().clone();

        // Draw
        terminal.draw(|f| {
            let area = f.area();
            render_screen(area, f.buffer_mut(), &snapshot, frame.as_ref(), &app);
        })?;

        // Handle input with timeout for frame updates
        if event::poll(timing::UI_POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match handle_key(&mut app, &snapshot, key) {
                KeyAction::None => {}
                KeyAction::Quit => break,
                KeyAction::Send(message) => {
                    if let Err(e) = handle.dispatch(message) {
                        warn!(error = %e, "Failed to send scanner command");
                        app.notice = Some(format!("Error: {}", e));
                    }
                }
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut TerminalApp, snapshot: &SessionSnapshot, key: KeyEvent) -> KeyAction {
    // Ctrl+C quits from any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return KeyAction::Quit;
    }

    if let Some(entry) = app.manual.as_mut() {
        match key.code {
            KeyCode::Char(c) => entry.push(c),
            KeyCode::Backspace => entry.backspace(),
            KeyCode::Esc => app.manual = None,
            KeyCode::Enter => {
                if let Some(code) = entry.submit() {
                    app.manual = None;
                    app.record(code, EntrySource::Manual);
                }
            }
            _ => {}
        }
        return KeyAction::None;
    }

    match key.code {
        KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Char(' ') if snapshot.supported && snapshot.ready => {
            app.show_help = false;
            KeyAction::Send(ScannerMessage::Toggle)
        }
        KeyCode::Char('d') if snapshot.show_device_selector() => {
            app.show_help = false;
            match snapshot.next_device() {
                Some(id) => KeyAction::Send(ScannerMessage::SelectDevice(id.clone())),
                None => KeyAction::None,
            }
        }
        KeyCode::Char('m') => {
            app.show_help = false;
            app.manual = Some(ManualEntry::new());
            KeyAction::Send(ScannerMessage::Stop)
        }
        KeyCode::Char('h') => {
            app.show_help = !app.show_help;
            KeyAction::None
        }
        _ => KeyAction::None,
    }
}

/// Lay out and draw the whole screen
fn render_screen(
    area: Rect,
    buf: &mut Buffer,
    snapshot: &SessionSnapshot,
    frame: Option<&Frame>,
    app: &TerminalApp,
) {
    let mut preview_area = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: area.height.saturating_sub(1),
    };

    // Error banner on the top line
    if snapshot.supported
        && let Some(message) = snapshot.error_message()
    {
        Banner {
            message,
            style: Style::default().fg(Color::White).bg(Color::Red),
        }
        .render(Rect { height: 1, ..preview_area }, buf);
        preview_area.y += 1;
        preview_area.height = preview_area.height.saturating_sub(1);
    }

    // Logged barcodes, newest first, just above the status bar
    if !app.log.is_empty() {
        let line_area = Rect {
            y: preview_area.y + preview_area.height.saturating_sub(1),
            height: 1,
            ..preview_area
        };
        Banner {
            message: &log_line(&app.log),
            style: Style::default().fg(Color::Green).bg(Color::Black),
        }
        .render(line_area, buf);
        preview_area.height = preview_area.height.saturating_sub(1);
    }

    // Manual entry line
    if let Some(entry) = &app.manual {
        let line_area = Rect {
            y: preview_area.y + preview_area.height.saturating_sub(1),
            height: 1,
            ..preview_area
        };
        let text = match entry.error() {
            Some(e) => format!("Barcode: {}_  ({})", entry.input(), e),
            None => format!("Barcode: {}_  (Enter to log, Esc to cancel)", entry.input()),
        };
        Banner {
            message: &text,
            style: Style::default().fg(Color::Black).bg(Color::Yellow),
        }
        .render(line_area, buf);
        preview_area.height = preview_area.height.saturating_sub(1);
    }

    if !snapshot.supported {
        Placeholder(ui::UNSUPPORTED_FALLBACK).render(preview_area, buf);
    } else {
        let widget = FrameWidget {
            frame: if snapshot.phase == SessionPhase::Live { frame } else { None },
            placeholder: placeholder_text(snapshot),
        };
        let image_area = widget.render_area(preview_area);
        widget.render(preview_area, buf);

        if snapshot.phase == SessionPhase::Live {
            ScanOverlay.render(image_area.unwrap_or(preview_area), buf);
        }
    }

    let status_area = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };
    let message = if app.show_help {
        build_help_message(snapshot)
    } else {
        build_status_message(snapshot, app)
    };
    StatusBar { message: &message }.render(status_area, buf);
}

fn log_line(log: &[(String, EntrySource)]) -> String {
    let entries: Vec<String> = log
        .iter()
        .rev()
        .map(|(code, source)| match source {
            EntrySource::Scanned => code.clone(),
            EntrySource::Manual => format!("{} (manual)", code),
        })
        .collect();
    format!("Logged ({}): {}", log.len(), entries.join(", "))
}

fn placeholder_text(snapshot: &SessionSnapshot) -> &'static str {
    if !snapshot.ready {
        return "Looking for cameras...";
    }
    match snapshot.phase {
        SessionPhase::Acquiring => "Starting camera...",
        SessionPhase::Live => "Waiting for camera...",
        _ if snapshot.switching_device => "Switching camera...",
        _ if snapshot.devices.is_empty() => "No cameras found",
        _ => "Press space to start scanning",
    }
}

fn build_status_message(snapshot: &SessionSnapshot, app: &TerminalApp) -> String {
    let mut parts = vec![snapshot.phase.to_string()];

    if let Some(label) = snapshot.selected_label() {
        parts.push(label);
    }
    if let Some((width, height)) = snapshot.resolution {
        match get_resolution_label(width) {
            Some(tier) => parts.push(format!("{}x{} {}", width, height, tier)),
            None => parts.push(format!("{}x{}", width, height)),
        }
    }
    if let Some(notice) = &app.notice {
        parts.push(notice.clone());
    }

    let mut keys = Vec::new();
    if snapshot.supported {
        keys.push(if snapshot.scanning || snapshot.switching_device {
            "space stop"
        } else {
            "space scan"
        });
    }
    if snapshot.show_device_selector() {
        keys.push("'d' camera");
    }
    keys.push("'m' manual");
    keys.push("'h' help");
    keys.push("'q' quit");

    format!("{} | {}", parts.join(" | "), keys.join(" | "))
}

fn build_help_message(snapshot: &SessionSnapshot) -> String {
    let mut msg = String::new();
    if snapshot.supported {
        msg.push_str("space: Start/stop scanning | ");
    }
    if snapshot.show_device_selector() {
        msg.push_str("d: Next camera | ");
    }
    msg.push_str("m: Enter barcode | h: Toggle help | q/Ctrl+C: Quit");
    msg
}

/// Widget that renders a grayscale frame using half-block characters
struct FrameWidget<'a> {
    frame: Option<&'a Frame>,
    placeholder: &'a str,
}

impl FrameWidget<'_> {
    /// Terminal cells covered by the image, keeping the frame aspect ratio
    fn render_area(&self, area: Rect) -> Option<Rect> {
        let frame = self.frame?;
        if frame.width == 0 || frame.height == 0 || area.width == 0 || area.height == 0 {
            return None;
        }

        // Each terminal cell displays 2 vertical pixels
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            ((h * frame_aspect) as u16, (h / 2.0) as u16)
        } else {
            let h = term_width / frame_aspect;
            (term_width as u16, (h / 2.0) as u16)
        };

        Some(Rect {
            x: area.x + area.width.saturating_sub(display_width) / 2,
            y: area.y + area.height.saturating_sub(display_height) / 2,
            width: display_width.max(1),
            height: display_height.max(1),
        })
    }
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (Some(frame), Some(target)) = (self.frame, self.render_area(area)) else {
            Placeholder(self.placeholder).render(area, buf);
            return;
        };

        let x_scale = frame.width as f64 / target.width as f64;
        let y_scale = frame.height as f64 / (target.height * 2) as f64;

        for ty in 0..target.height {
            for tx in 0..target.width {
                let term_x = target.x + tx;
                let term_y = target.y + ty;
                if term_x >= area.right() || term_y >= area.bottom() {
                    continue;
                }

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(gray(frame.sample(src_x, src_y_top)));
                    cell.set_bg(gray(frame.sample(src_x, src_y_bottom)));
                }
            }
        }
    }
}

fn gray(v: u8) -> Color {
    Color::Rgb(v, v, v)
}

/// Dashed scan target with a positioning hint
struct ScanOverlay;

impl ScanOverlay {
    fn target(area: Rect) -> Rect {
        let width = ((area.width as f32 * ui::TARGET_WIDTH_FRACTION) as u16).max(2);
        let height = ((area.height as f32 * ui::TARGET_HEIGHT_FRACTION) as u16).max(2);
        Rect {
            x: area.x + area.width.saturating_sub(width) / 2,
            y: area.y + area.height.saturating_sub(height) / 2,
            width: width.min(area.width),
            height: height.min(area.height),
        }
    }
}

impl Widget for ScanOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 4 || area.height < 3 {
            return;
        }
        let target = Self::target(area);
        let (left, right) = (target.x, target.right() - 1);
        let (top, bottom) = (target.y, target.bottom() - 1);

        let mut mark = |x: u16, y: u16, c: char| {
            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.set_char(c);
                cell.set_fg(Color::White);
            }
        };

        for x in left + 1..right {
            let c = if (x - left) % 2 == 1 { '╌' } else { ' ' };
            if c != ' ' {
                mark(x, top, c);
                mark(x, bottom, c);
            }
        }
        for y in top + 1..bottom {
            mark(left, y, '╎');
            mark(right, y, '╎');
        }
        mark(left, top, '┌');
        mark(right, top, '┐');
        mark(left, bottom, '└');
        mark(right, bottom, '┘');

        // Hint just below the target, or inside it when there is no room
        let hint_y = if bottom + 1 < area.bottom() { bottom + 1 } else { bottom.saturating_sub(1) };
        let hint_x = area.x + area.width.saturating_sub(ui::SCAN_HINT.len() as u16) / 2;
        buf.set_string(
            hint_x,
            hint_y,
            truncate(ui::SCAN_HINT, area.width as usize),
            Style::default().fg(Color::White).bg(Color::Black),
        );
    }
}

/// Centered single-line message
struct Placeholder<'a>(&'a str);

impl Widget for Placeholder<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let text = truncate(self.0, area.width as usize);
        let x = area.x + area.width.saturating_sub(text.chars().count() as u16) / 2;
        let y = area.y + area.height / 2;
        buf.set_string(x, y, text, Style::default());
    }
}

/// Full-width single-line message
struct Banner<'a> {
    message: &'a str,
    style: Style,
}

impl Widget for Banner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.right() {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_style(self.style);
            }
        }
        buf.set_string(
            area.x,
            area.y,
            truncate(self.message, area.width as usize),
            self.style,
        );
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Banner {
            message: self.message,
            style: Style::default().fg(Color::White).bg(Color::DarkGray),
        }
        .render(area, buf);
    }
}

fn truncate(text: &str, width: usize) -> &str {
    match text.char_indices().nth(width) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{DeviceDescriptor, DeviceId};
    use crate::errors::ScanError;

    fn buffer_text(buf: &Buffer) -> String {
        let area = buf.area;
        let mut text = String::new();
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                text.push_str(buf.cell((x, y)).map(|c| c.symbol()).unwrap_or(" "));
            }
            text.push('\n');
        }
        text
    }

    fn two_cameras() -> SessionSnapshot {
        SessionSnapshot {
            ready: true,
            supported: true,
            devices: vec![
                DeviceDescriptor::new("/dev/video0", "Front Camera"),
                DeviceDescriptor::new("/dev/video2", "Back Camera"),
            ],
            selected_device_id: Some(DeviceId::from("/dev/video2")),
            ..Default::default()
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_frame_widget_renders_half_blocks() {
        let frame = Frame::new(4, 4, vec![255; 16]);
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        FrameWidget {
            frame: Some(&frame),
            placeholder: "",
        }
        .render(area, &mut buf);

        let cell = buf.cell((0, 0)).unwrap();
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 255, 255));
    }

    #[test]
    fn test_live_screen_shows_scan_hint() {
        let snapshot = SessionSnapshot {
            phase: SessionPhase::Live,
            scanning: true,
            ..two_cameras()
        };
        let frame = Frame::new(64, 36, vec![0; 64 * 36]);
        let area = Rect::new(0, 0, 64, 20);
        let mut buf = Buffer::empty(area);
        render_screen(area, &mut buf, &snapshot, Some(&frame), &TerminalApp::new());

        let text = buffer_text(&buf);
        assert!(text.contains(ui::SCAN_HINT));
        assert!(text.contains('┌'));
    }

    #[test]
    fn test_unsupported_shows_fallback() {
        let snapshot = SessionSnapshot {
            phase: SessionPhase::Unsupported,
            ready: true,
            supported: false,
            error: Some(ScanError::UnsupportedPlatform),
            ..Default::default()
        };
        let area = Rect::new(0, 0, 100, 6);
        let mut buf = Buffer::empty(area);
        render_screen(area, &mut buf, &snapshot, None, &TerminalApp::new());

        assert!(buffer_text(&buf).contains("Barcode scanning is not available"));
    }

    #[test]
    fn test_error_banner() {
        let snapshot = SessionSnapshot {
            phase: SessionPhase::Error,
            error: Some(ScanError::PermissionOrDevice("EACCES".into())),
            ..two_cameras()
        };
        let area = Rect::new(0, 0, 80, 6);
        let mut buf = Buffer::empty(area);
        render_screen(area, &mut buf, &snapshot, None, &TerminalApp::new());

        let first_line = buffer_text(&buf).lines().next().unwrap_or_default().to_string();
        assert!(first_line.contains("Unable to access camera"));
    }

    #[test]
    fn test_camera_key_only_with_several_devices() {
        let mut app = TerminalApp::new();
        let snapshot = two_cameras();
        assert_eq!(
            handle_key(&mut app, &snapshot, press(KeyCode::Char('d'))),
            KeyAction::Send(ScannerMessage::SelectDevice(DeviceId::from("/dev/video0")))
        );

        let single = SessionSnapshot {
            devices: vec![DeviceDescriptor::new("/dev/video0", "USB Camera")],
            selected_device_id: Some(DeviceId::from("/dev/video0")),
            ..two_cameras()
        };
        assert_eq!(
            handle_key(&mut app, &single, press(KeyCode::Char('d'))),
            KeyAction::None
        );
        assert!(!build_status_message(&single, &app).contains("'d'"));
    }

    #[test]
    fn test_manual_entry_logs_valid_code() {
        let mut app = TerminalApp::new();
        let snapshot = two_cameras();

        assert_eq!(
            handle_key(&mut app, &snapshot, press(KeyCode::Char('m'))),
            KeyAction::Send(ScannerMessage::Stop)
        );
        for c in "96385074".chars() {
            handle_key(&mut app, &snapshot, press(KeyCode::Char(c)));
        }
        // 'q' is typed into the editor, not treated as quit
        assert_eq!(
            handle_key(&mut app, &snapshot, press(KeyCode::Char('q'))),
            KeyAction::None
        );
        handle_key(&mut app, &snapshot, press(KeyCode::Enter));

        assert!(app.manual.is_none());
        assert_eq!(app.log, vec![("96385074".to_string(), EntrySource::Manual)]);
    }

    #[test]
    fn test_log_line_lists_newest_first() {
        let mut app = TerminalApp::new();
        app.record("012345678905".to_string(), EntrySource::Scanned);
        app.record("96385074".to_string(), EntrySource::Manual);
        app.record("4006381333931".to_string(), EntrySource::Scanned);

        let area = Rect::new(0, 0, 80, 8);
        let mut buf = Buffer::empty(area);
        render_screen(area, &mut buf, &two_cameras(), None, &app);

        let text = buffer_text(&buf);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[6].starts_with("Logged (3): 4006381333931, 96385074 (manual), 012345678905"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("╌╌╌", 2), "╌╌");
        assert_eq!(truncate("abc", 10), "abc");
    }
}

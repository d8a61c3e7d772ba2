//! Terminal views
//!
//! Features:
//! - Login prompt (masked password)
//! - Chat view: transcript, auto-sizing input, status bar
//! - Refresh overlay
//! - Markdown-lite rendering for assistant replies

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::chat::{self, ChatState, ExchangePhase, SharedChat};
use crate::client::Webhook;
use crate::credential::Credential;
use crate::exchange::{self, SubmitOutcome};
use crate::gate::{ChatEntry, LoginOutcome, SessionGate};
use crate::input::{self, KeyIntent};
use crate::refresh;
use crate::transcript::{Entry, Origin, Severity};

// ═══════════════════════════════════════════════════════════════
// LOGIN VIEW
// ═══════════════════════════════════════════════════════════════

/// Raw mode for the line prompt, switched off again on drop so an
/// input error can't leave the terminal raw.
struct RawMode {
    disable: fn() -> io::Result<()>,
}

impl RawMode {
    fn enable() -> Result<Self> {
        enable_raw_mode()?;
        Ok(Self {
            disable: disable_raw_mode,
        })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = (self.disable)();
    }
}

/// Read one line in raw mode. None on Esc.
fn read_field(label: &str, masked: bool) -> Result<Option<String>> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let raw = RawMode::enable()?;
    let mut value = String::new();

    let result = loop {
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(k) = event::read()? else {
            continue;
        };
        if k.kind != KeyEventKind::Press {
            continue;
        }
        match k.code {
            KeyCode::Enter => break Some(value),
            KeyCode::Esc => break None,
            KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => break None,
            KeyCode::Char(c) => {
                value.push(c);
                print!("{}", if masked { '*' } else { c });
                io::stdout().flush()?;
            }
            KeyCode::Backspace => {
                if value.pop().is_some() {
                    print!("\x08 \x08");
                    io::stdout().flush()?;
                }
            }
            _ => {}
        }
    };

    drop(raw);
    println!();
    Ok(result)
}

/// Login view. Returns false if the user backed out.
pub async fn run_login(gate: &SessionGate, webhook: &dyn Webhook) -> Result<bool> {
    println!("Sign in to the chat webhook (Esc to quit)\n");

    loop {
        let Some(username) = read_field("Username", false)? else {
            return Ok(false);
        };
        let Some(password) = read_field("Password", true)? else {
            return Ok(false);
        };

        match gate.login(webhook, &username, &password).await {
            LoginOutcome::Authenticated => return Ok(true),
            failed => println!("{}\n", failed.message().unwrap_or_default()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// CHAT VIEW
// ═══════════════════════════════════════════════════════════════

/// Why the chat view closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatExit {
    Quit,
    RedirectToLogin,
}

/// Run the chat view. Redirects before touching the terminal if the
/// session has no credential.
pub async fn run_chat(gate: &SessionGate, webhook: Arc<dyn Webhook>) -> Result<ChatExit> {
    let credential = match gate.enter_chat() {
        ChatEntry::Granted(c) => c,
        ChatEntry::RedirectToLogin => return Ok(ChatExit::RedirectToLogin),
    };

    let chat = chat::shared();
    let mut terminal = setup_terminal()?;
    let result = run_chat_loop(&mut terminal, &chat, webhook, credential).await;
    restore_terminal(terminal)?;
    result
}

async fn run_chat_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    chat: &SharedChat,
    webhook: Arc<dyn Webhook>,
    credential: Credential,
) -> Result<ChatExit> {
    let mut tick: usize = 0;

    loop {
        tick += 1;

        {
            let state = chat::lock(chat);
            terminal.draw(|f| render_chat(f, &state, tick))?;
        }

        // Yield so spawned exchanges and timers make progress
        tokio::time::sleep(Duration::from_millis(10)).await;

        if !event::poll(Duration::from_millis(40))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let intent = {
            let mut state = chat::lock(chat);
            if state.overlay {
                input::overlay_intent(key)
            } else {
                state.input.handle_key(key)
            }
        };

        match intent {
            KeyIntent::Quit => return Ok(ChatExit::Quit),
            KeyIntent::Submit => match exchange::submit(chat) {
                SubmitOutcome::Started(pending) => {
                    pending.spawn(webhook.clone(), credential.clone());
                }
                SubmitOutcome::Busy => tracing::debug!("submit ignored, exchange in flight"),
                SubmitOutcome::Empty => {}
            },
            KeyIntent::Refresh => {
                refresh::spawn(chat.clone(), webhook.clone(), credential.clone());
            }
            KeyIntent::Edited | KeyIntent::Ignored => {}
        }
    }
}

fn render_chat(f: &mut Frame, state: &ChatState, tick: usize) {
    let area = f.size();
    let input_rows = state.input.desired_rows(area.width.saturating_sub(2));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),                 // Transcript
            Constraint::Length(input_rows + 2), // Input
            Constraint::Length(1),              // Status
        ])
        .split(area);

    // Transcript, pinned to the newest entry
    let lines = transcript_lines(state, tick);
    let inner = chunks[0].inner(&Margin::new(1, 1));
    let offset = scroll_offset(&lines, inner.width, inner.height);
    let para = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0))
        .block(Block::default().borders(Borders::ALL).title("hookchat"));
    f.render_widget(para, chunks[0]);

    // Input
    let (title, style) = if state.input.is_enabled() {
        ("Message (Enter: send, Shift+Enter: newline)", Style::default())
    } else {
        ("Waiting for reply...", Style::default().fg(Color::DarkGray))
    };
    let input = Paragraph::new(state.input.text())
        .style(style)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(input, chunks[1]);

    // Status bar
    let activity = match state.phase {
        ExchangePhase::Idle => ' ',
        _ => spinner_char(tick),
    };
    let status = format!(
        " {} | Ctrl+S: send  Ctrl+R: refresh knowledgebase  Esc: quit",
        activity
    );
    f.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );

    if state.overlay {
        render_overlay(f, area, tick);
    }
}

fn render_overlay(f: &mut Frame, area: Rect, tick: usize) {
    let popup = centered(area, 44, 5);
    f.render_widget(Clear, popup);
    let text = format!("\n{} Refreshing knowledgebase...", spinner_char(tick));
    let para = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Please wait"));
    f.render_widget(para, popup);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn transcript_lines(state: &ChatState, tick: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for entry in state.transcript.entries() {
        match entry {
            Entry::Message(m) => {
                let stamp = m.timestamp.with_timezone(&chrono::Local).format("%H:%M");
                let (who, color) = match m.origin {
                    Origin::User => ("you", Color::Cyan),
                    Origin::Assistant => ("assistant", Color::Green),
                };
                lines.push(Line::styled(
                    format!("{} · {}", who, stamp),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ));
                if m.origin.is_rich() {
                    lines.extend(render_markdown(&m.body));
                } else {
                    // Literal: never interpreted
                    lines.extend(m.body.lines().map(|l| Line::raw(l.to_string())));
                }
            }
            Entry::Progress => {
                lines.push(Line::styled(
                    format!("{} thinking", spinner_char(tick)),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            Entry::Notice(n) => {
                let color = match n.severity {
                    Severity::Success => Color::Green,
                    Severity::Error => Color::Red,
                };
                lines.push(Line::styled(
                    format!("[{}]", n.text),
                    Style::default().fg(color).add_modifier(Modifier::ITALIC),
                ));
            }
        }
        lines.push(Line::default());
    }

    lines
}

/// Rows to skip so the last line sits at the bottom
fn scroll_offset(lines: &[Line], width: u16, height: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = lines
        .iter()
        .map(|l| l.width().max(1).div_ceil(width))
        .sum();
    rows.saturating_sub(usize::from(height)).min(usize::from(u16::MAX)) as u16
}

// ═══════════════════════════════════════════════════════════════
// MARKDOWN
// ═══════════════════════════════════════════════════════════════

/// Render the subset of markdown webhooks usually send back: headings,
/// bullets, fenced code, **bold** and `code` spans.
pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    let code_style = Style::default().fg(Color::Yellow);
    let mut lines = Vec::new();
    let mut in_fence = false;

    for raw in text.lines() {
        let trimmed = raw.trim_start();

        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            lines.push(Line::styled(format!("  {}", raw), code_style));
            continue;
        }

        let heading = trimmed.trim_start_matches('#');
        if heading.len() < trimmed.len() && heading.starts_with(' ') {
            lines.push(Line::styled(
                heading.trim().to_string(),
                Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            ));
            continue;
        }

        let bullet = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "));
        let mut spans = Vec::new();
        let body = match bullet {
            Some(rest) => {
                let indent = raw.len() - trimmed.len();
                spans.push(Span::raw(format!("{}• ", " ".repeat(indent))));
                rest
            }
            None => raw,
        };
        spans.extend(inline_spans(body));
        lines.push(Line::from(spans));
    }

    lines
}

fn inline_spans(text: &str) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let bold = rest.find("**");
        let code = rest.find('`');

        let (start, marker, style) = match (bold, code) {
            (Some(b), Some(c)) if c < b => (c, "`", Style::default().fg(Color::Yellow)),
            (Some(b), _) => (b, "**", Style::default().add_modifier(Modifier::BOLD)),
            (None, Some(c)) => (c, "`", Style::default().fg(Color::Yellow)),
            (None, None) => break,
        };

        let after = &rest[start + marker.len()..];
        let Some(end) = after.find(marker) else {
            break;
        };

        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(after[..end].to_string(), style));
        rest = &after[end + marker.len()..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }
    spans
}

fn spinner_char(tick: usize) -> char {
    const SPINNER: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
    SPINNER[tick % SPINNER.len()]
}

// ═══════════════════════════════════════════════════════════════
// TERMINAL SETUP
// ═══════════════════════════════════════════════════════════════

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

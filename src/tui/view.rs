use std::io::Stdout;

use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Cell, Gauge, Paragraph, Row, Table};
use ratatui::{Frame, Terminal};

use crate::mixer::StatusReporter;
use crate::shared::{format_time, StatusEvent, StatusKind, StatusSnapshot, TransportState};

const CONTROLS: &str =
    "SPACE play/pause  S stop  R rewind  1-9 toggle  \u{2191}\u{2193} select  \u{2190}\u{2192} volume  Q quit";

// Redraws the whole screen on every event. The last user error sticks on
// the message line until something else happens.
pub struct TuiReporter {
    term: Terminal<CrosstermBackend<Stdout>>,
    message: Option<String>,
}

impl TuiReporter {
    pub fn new() -> std::io::Result<Self> {
        let mut term = Terminal::new(CrosstermBackend::new(std::io::stdout()))?;
        term.clear()?;
        Ok(Self { term, message: None })
    }
}

impl StatusReporter for TuiReporter {
    fn report(&mut self, event: &StatusEvent) -> anyhow::Result<()> {
        match &event.kind {
            StatusKind::Quit => return Ok(()),
            StatusKind::UserError(msg) => self.message = Some(msg.clone()),
            StatusKind::Ended => self.message = Some("End of song".into()),
            StatusKind::Tick => {}
            _ => self.message = None,
        }
        let message = self.message.as_deref();
        self.term.draw(|frame| render(frame, frame.area(), &event.status, message))?;
        Ok(())
    }
}

pub fn render(frame: &mut Frame, area: Rect, status: &StatusSnapshot, message: Option<&str>) {
    let sections = Layout::vertical([
        Constraint::Length(3), // title + transport
        Constraint::Length(1), // progress
        Constraint::Min(4), // stem table
        Constraint::Length(2), // message + controls
    ])
    .split(area);

    draw_header(frame, sections[0], status);
    draw_progress(frame, sections[1], status);
    draw_stems(frame, sections[2], status);
    draw_footer(frame, sections[3], message);
}

fn state_color(state: TransportState) -> Color {
    match state {
        TransportState::Playing => Color::Green,
        TransportState::Paused => Color::Yellow,
        TransportState::Stopped => Color::Red,
    }
}

fn draw_header(frame: &mut Frame, area: Rect, status: &StatusSnapshot) {
    let mut spans = vec![
        Span::raw("Status: "),
        Span::styled(
            status.state.label(),
            Style::default().fg(state_color(status.state)).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "   {} / {}",
            format_time(status.position),
            format_time(status.duration)
        )),
    ];
    if status.full_mix_active {
        spans.push(Span::styled("   [full mix]", Style::default().fg(Color::Cyan)));
    }
    let block = Block::bordered().title(format!(" irmix :: {} ", status.song));
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_progress(frame: &mut Frame, area: Rect, status: &StatusSnapshot) {
    let ratio = if status.duration.is_zero() {
        0.0
    } else {
        (status.position.as_secs_f64() / status.duration.as_secs_f64()).clamp(0.0, 1.0)
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(state_color(status.state)))
        .ratio(ratio)
        .label("");
    frame.render_widget(gauge, area);
}

fn draw_stems(frame: &mut Frame, area: Rect, status: &StatusSnapshot) {
    let rows = status.stems.iter().map(|stem| {
        let (text, color) = if stem.audible {
            ("ACTIVE", Color::Green)
        } else {
            ("MUTED", Color::DarkGray)
        };
        // a muted stem plays at zero whatever its level
        let volume = if stem.audible {
            Cell::from(format!("{:.1}", stem.volume))
        } else {
            Cell::from("0.0").style(Style::default().fg(Color::DarkGray))
        };
        let row = Row::new(vec![
            Cell::from(stem.key.to_string()),
            Cell::from(stem.label.title()),
            Cell::from(text).style(Style::default().fg(color)),
            volume,
        ]);
        if stem.selected {
            row.style(Style::default().add_modifier(Modifier::REVERSED))
        } else {
            row
        }
    });
    let header = Row::new(vec!["Key", "Stem", "Status", "Volume"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(Block::bordered().title(" Stems "));
    frame.render_widget(table, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, message: Option<&str>) {
    let lines = vec![
        Line::from(Span::styled(
            message.unwrap_or(""),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(Span::styled(CONTROLS, Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

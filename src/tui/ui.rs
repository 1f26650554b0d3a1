//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::machine::{Registers, MEMORY_SIZE};
use super::app::DebuggerApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(60),
            Constraint::Percentage(40),
        ])
        .split(frame.area());

    // Left side: code and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(10),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_code(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: memory, stack and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_stack(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

/// Draw the words around the instruction pointer.
fn draw_code(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let window = app.code_window((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = window
        .iter()
        .map(|(addr, word, decoded, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:04X}: {:04X}  {}", prefix, addr, word, decoded);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Code ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw the register file, four registers per row.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = app.machine.regs.as_array();

    let mut content: Vec<Line> = regs
        .chunks(4)
        .enumerate()
        .map(|(row, values)| {
            let spans: Vec<Span> = values
                .iter()
                .enumerate()
                .flat_map(|(col, value)| {
                    let index = (row * 4 + col) as u8;
                    let style = match index {
                        Registers::IP => Style::default().fg(Color::Yellow),
                        Registers::SP => Style::default().fg(Color::Magenta),
                        _ if *value != 0 => Style::default().fg(Color::White),
                        _ => Style::default().fg(Color::DarkGray),
                    };
                    [
                        Span::raw(format!("r{:X}: ", index)),
                        Span::styled(format!("{:04X}  ", value), style),
                    ]
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    content.push(Line::from(""));
    content.push(Line::from(vec![
        Span::raw("Cycles: "),
        Span::styled(format!("{}", app.machine.cycles), Style::default().fg(Color::Cyan)),
        Span::raw("   Counter: "),
        Span::raw(format!("{:?}", app.machine.config().counter)),
        Span::raw("   State: "),
        Span::styled(
            if app.halted { "Halted" } else if app.running { "Running" } else { "Stopped" },
            if app.halted {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Green)
            },
        ),
    ]));

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw memory view.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let start = app.mem_scroll;
    let end = (start + visible_rows).min(MEMORY_SIZE);
    let ip = app.machine.regs.ip() as usize;

    let items: Vec<ListItem> = (start..end)
        .map(|addr| {
            let value = app.machine.mem.read(addr as u16);
            let text = format!("{:04X}: {:04X}", addr, value);

            let style = if addr == ip {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if value != 0 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw the top of the stack, newest entry first.
fn draw_stack(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let sp = app.machine.regs.sp() as usize;

    let items: Vec<ListItem> = if app.machine.stack_in_use() {
        app.machine
            .stack()
            .iter()
            .take(visible_rows)
            .enumerate()
            .map(|(i, value)| ListItem::new(format!("{:04X}: {:04X}", sp + i, value)))
            .collect()
    } else {
        vec![ListItem::new("(empty)").style(Style::default().fg(Color::DarkGray))]
    };

    let list = List::new(items)
        .block(Block::default()
            .title(" Stack ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)));

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  b: Breakpoint"),
        Line::from("x: Reset  ↑↓: Scroll memory  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

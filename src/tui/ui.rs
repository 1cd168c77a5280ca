//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::app::DebuggerApp;
use crate::vm::{CmpOrder, MEMORY_SIZE};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(frame.area());

    // Left side: code and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: memory and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(6)])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_help(frame, right_chunks[1]);
}

/// Draw the disassembly window around the program counter.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{} {}{:04}: {}", bp, prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(list, area);
}

/// Draw register and flag state.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let reg = |i: u16| app.machine.regs.get(i).unwrap_or(0);

    let mut content = vec![
        Line::from(format!(
            "R0: {:<10} R1: {:<10} R2: {:<10} R3: {:<10}",
            reg(0),
            reg(1),
            reg(2),
            reg(3)
        )),
        Line::from(format!(
            "R4: {:<10} R5: {:<10} R6: {:<10} R7: {:<10}",
            reg(4),
            reg(5),
            reg(6),
            reg(7)
        )),
    ];

    content.push(Line::from(vec![
        Span::raw("PC: "),
        Span::styled(format!("{:04}", app.machine.pc), Style::default().fg(Color::Yellow)),
        Span::raw("   equal: "),
        Span::raw(format!("{}", app.machine.flags.equal)),
        Span::raw("   order: "),
        Span::styled(
            format!("{:?}", app.machine.flags.order),
            order_style(app.machine.flags.order),
        ),
    ]));

    content.push(Line::from(vec![
        Span::raw("Stack: "),
        Span::raw(format!("{:<6}", app.machine.stack.depth())),
        Span::raw("Cycles: "),
        Span::styled(format!("{:<10}", app.machine.cycles), Style::default().fg(Color::Cyan)),
        Span::raw("State: "),
        Span::styled(
            format!("{:?}", app.machine.state),
            if app.machine.is_running() {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            },
        ),
    ]));

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );

    frame.render_widget(paragraph, area);
}

/// Draw the memory byte view.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let start = app.mem_scroll;
    let end = (start + visible_rows).min(MEMORY_SIZE);

    let items: Vec<ListItem> = (start..end)
        .map(|addr| {
            let value = app.machine.mem.read(addr as u32).unwrap_or(0);
            let text = format!("{:04}: {:3}  0x{:02X}", addr, value, value);

            let style = if value != 0 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default().title(" Status ").borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  b: Breakpoint"),
        Line::from("x: Reset  ↑↓: Scroll memory  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().title(" Help ").borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// Color the three-way order like a diff.
fn order_style(order: CmpOrder) -> Style {
    match order {
        CmpOrder::Less => Style::default().fg(Color::Red),
        CmpOrder::Equal => Style::default().fg(Color::Gray),
        CmpOrder::Greater => Style::default().fg(Color::Green),
    }
}

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::api::ApiClient;
use crate::render::JobMatchView;

struct AppState {
    analyses: Vec<Vec<JobMatchView>>,
    selected: usize,
    scroll_offset: u16,
}

impl AppState {
    fn new(analyses: Vec<Vec<JobMatchView>>) -> Self {
        Self {
            analyses,
            selected: 0,
            scroll_offset: 0,
        }
    }

    fn current(&self) -> Option<&Vec<JobMatchView>> {
        self.analyses.get(self.selected)
    }

    fn next(&mut self) {
        if !self.analyses.is_empty() && self.selected < self.analyses.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}

/// Interactive browser over the analyses stored on the server.
pub fn run_browse(client: &ApiClient) -> Result<()> {
    let analyses = client.list_analyses()?;
    if analyses.is_empty() {
        println!("No analyses found.");
        return Ok(());
    }

    let mut state = AppState::new(analyses.iter().map(crate::render::project).collect());

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                _ => {}
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(frame.area());

    // Left panel: stored analyses
    let items: Vec<ListItem> = state
        .analyses
        .iter()
        .enumerate()
        .map(|(i, views)| {
            let label = views
                .first()
                .map(|v| v.title.clone())
                .unwrap_or_else(|| "(no matches)".to_string());
            let label = crate::render::truncate(&label, 30);
            ListItem::new(format!("#{:<3} {} ({})", i + 1, label, views.len()))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Analyses ({}) ", state.analyses.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: rendered report
    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Report "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let help_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let help = Paragraph::new(" j/k:select analysis  J/K:scroll  q:quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, help_area[1]);
}

fn score_style(pct: u8) -> Style {
    if pct >= 70 {
        Style::default().fg(Color::Green)
    } else if pct >= 40 {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Red)
    }
}

fn build_detail<'a>(state: &'a AppState) -> Text<'a> {
    let Some(views) = state.current() else {
        return Text::raw("No analysis selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    for (i, view) in views.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            format!("#{} {}", i + 1, view.title),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        if let Some(byline) = &view.byline {
            lines.push(Line::from(byline.as_str()));
        }
        if let Some(kind) = &view.employment_type {
            lines.push(Line::from(kind.as_str()));
        }

        lines.push(Line::from(vec![
            Span::raw("Overall "),
            Span::styled(
                format!("{}%", view.overall_pct),
                score_style(view.overall_pct),
            ),
            Span::raw("  Skills "),
            Span::styled(format!("{}%", view.skills_pct), score_style(view.skills_pct)),
        ]));

        if !view.matching_skills.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("Matching: {}", view.matching_skills.join(", ")),
                Style::default().fg(Color::Green),
            )));
        }
        if !view.missing_skills.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("Missing: {}", view.missing_skills.join(", ")),
                Style::default().fg(Color::Red),
            )));
        }

        push_section(&mut lines, "Why You Fit", &view.why_fit);
        push_section(&mut lines, "Growth Areas", &view.growth_areas);

        if let Some(summary) = &view.summary {
            lines.push(Line::from(Span::styled(
                "Summary",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for line in textwrap::fill(summary, 70).lines() {
                lines.push(Line::from(format!("  {}", line)));
            }
        }
    }

    Text::from(lines)
}

fn push_section(lines: &mut Vec<Line>, label: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }
    lines.push(Line::from(Span::styled(
        label.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for entry in entries {
        for line in textwrap::fill(entry, 68).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }
}

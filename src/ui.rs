use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use gridtrial::{
    clock::Clock,
    session::{Cell, Grid},
    survey::{PairChoice, Section, LIKERT_ITEMS, PAIRWISE_COMBINATIONS, TLX_FACTORS},
    trial::Phase,
};

use crate::{App, Screen};

const HORIZONTAL_MARGIN: u16 = 2;
const HEADER_LINES: u16 = 2;
const FOOTER_LINES: u16 = 2;

/// Region the cell grid occupies inside the full frame.
pub fn grid_area(area: Rect) -> Rect {
    let [_, grid, _] = Layout::vertical([
        Constraint::Length(HEADER_LINES),
        Constraint::Min(0),
        Constraint::Length(FOOTER_LINES),
    ])
    .horizontal_margin(HORIZONTAL_MARGIN)
    .areas(area);
    grid
}

/// One rect per cell, row-major, so index `i` holds cell `i + 1`.
pub fn cell_rects(grid: Grid, area: Rect) -> Vec<Rect> {
    let rows = Layout::vertical(vec![Constraint::Ratio(1, grid.rows); grid.rows as usize])
        .split(area);
    rows.iter()
        .flat_map(|row| {
            Layout::horizontal(vec![Constraint::Ratio(1, grid.cols); grid.cols as usize])
                .split(*row)
                .to_vec()
        })
        .collect()
}

/// Hit-test a terminal position against the grid drawn in `viewport`.
pub fn cell_at(grid: Grid, viewport: Rect, column: u16, row: u16) -> Option<Cell> {
    let position = Position::new(column, row);
    cell_rects(grid, grid_area(viewport))
        .iter()
        .position(|rect| rect.contains(position))
        .map(|idx| idx as Cell + 1)
}

impl<C: Clock> Widget for &App<C> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            Screen::Task => render_task(self, area, buf),
            Screen::Summary => render_summary(self, area, buf),
            Screen::Survey => render_survey(self, area, buf),
            Screen::Done => render_done(self, area, buf),
        }
    }
}

fn render_task<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let target_style = Style::default().patch(bold_style).fg(Color::Red);
    let preview_style = Style::default().fg(Color::LightRed);

    let config = app.driver.config();
    let state = app.driver.state();
    let grid = config.grid();

    let [header, _, footer] = Layout::vertical([
        Constraint::Length(HEADER_LINES),
        Constraint::Min(0),
        Constraint::Length(FOOTER_LINES),
    ])
    .horizontal_margin(HORIZONTAL_MARGIN)
    .areas(area);

    let countdown = state
        .countdown_remaining
        .map(|n| Span::styled(format!("  {}  ", n), target_style))
        .unwrap_or_else(|| Span::raw("     "));
    let progress = if config.mode().is_practice() {
        Span::styled("practice", dim_style)
    } else {
        Span::styled(
            format!(
                "{} / {}",
                (state.current_index + 1).min(config.total_cells() as usize),
                config.total_cells()
            ),
            bold_style,
        )
    };
    Paragraph::new(Line::from(vec![progress, countdown]))
        .alignment(Alignment::Center)
        .render(header, buf);

    for (idx, rect) in cell_rects(grid, grid_area(area)).into_iter().enumerate() {
        let cell = idx as Cell + 1;
        let style = if state.current_target == Some(cell) {
            target_style
        } else if state.phase == Phase::CountingDown && state.preview_target == Some(cell) {
            preview_style
        } else {
            Style::default()
        };
        let border = if app.cursor == cell {
            BorderType::Thick
        } else {
            BorderType::Plain
        };
        let block = Block::bordered()
            .border_type(border)
            .title(Span::styled(cell.to_string(), dim_style));
        let inner = block.inner(rect);
        block.render(rect, buf);

        // vertically center the mark when the cell has room for it
        let mark_area = Rect {
            y: inner.y + inner.height.saturating_sub(1) / 2,
            height: inner.height.min(1),
            ..inner
        };
        Paragraph::new(Span::styled("×", style))
            .alignment(Alignment::Center)
            .render(mark_area, buf);
    }

    let legend = if config.mode().is_practice() {
        "click or (enter) select / arrows move / (esc) end practice"
    } else {
        "click or (enter) select / arrows move / (esc) quit without saving"
    };
    Paragraph::new(Span::styled(
        legend,
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(footer, buf);
}

fn render_summary<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::styled("session complete", bold_style), Line::raw("")];

    if let Some(report) = &app.report {
        let summary = &report.summary;
        lines.push(Line::styled(
            format!(
                "{} ms avg   {:.2}% acc   {:.2} avg error",
                summary.average_response_time_ms,
                summary.accuracy_rate_percent,
                summary.average_manhattan_error
            ),
            bold_style,
        ));
        lines.push(Line::raw(format!("{} trials", report.records.len())));
    }
    lines.push(Line::raw(""));
    lines.push(export_line(app.results_path.as_deref(), app.status.as_deref()));
    lines.push(Line::raw(""));

    let legend = match (app.survey_enabled, app.results_path.is_some()) {
        (true, true) => "(enter) questionnaire / (esc)ape",
        (true, false) => "(enter) questionnaire / (r)etry export / (esc)ape",
        (false, true) => "(enter) finish / (esc)ape",
        (false, false) => "(enter) finish / (r)etry export / (esc)ape",
    };
    lines.push(Line::styled(
        legend,
        Style::default().add_modifier(Modifier::ITALIC),
    ));

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(centered(area, 8), buf);
}

fn render_survey<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let selected_style = Style::default().patch(bold_style).fg(Color::Cyan);
    let form = &app.survey;

    let mut lines = Vec::new();
    match form.section() {
        Section::Likert | Section::Ratings => {
            let (title, items, answers): (&str, Vec<&str>, Vec<Option<u8>>) =
                if form.section() == Section::Likert {
                    (
                        "how much do you agree? 1 (not at all) to 7 (completely)",
                        LIKERT_ITEMS.iter().map(|(_, prompt)| *prompt).collect(),
                        form.likert().to_vec(),
                    )
                } else {
                    (
                        "workload rating, 1 (low) to 7 (high)",
                        TLX_FACTORS.iter().map(|(_, prompt)| *prompt).collect(),
                        form.ratings().to_vec(),
                    )
                };
            lines.push(Line::styled(title, bold_style));
            lines.push(Line::raw(""));

            let width = items.iter().map(|p| p.width()).max().unwrap_or(0);
            for (idx, (prompt, answer)) in items.iter().zip(answers).enumerate() {
                let marker = if idx == app.survey_item { "› " } else { "  " };
                let padding = " ".repeat(width - prompt.width());
                let value = answer.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
                let style = if idx == app.survey_item {
                    selected_style
                } else {
                    Style::default()
                };
                lines.push(Line::styled(
                    format!("{}{}{}   [{}]", marker, prompt, padding, value),
                    style,
                ));
            }
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                "(1-7) answer / arrows move / (enter) next section",
                italic_style,
            ));
        }
        Section::Pairwise | Section::Complete => {
            let (a, b, choice) = form.current_pair();
            lines.push(Line::styled(
                format!(
                    "which mattered more for the task? ({} / {})",
                    form.pair_index() + 1,
                    PAIRWISE_COMBINATIONS.len()
                ),
                bold_style,
            ));
            lines.push(Line::raw(""));
            let pick = |which: PairChoice, label: &'static str| {
                if choice == Some(which) {
                    Span::styled(format!("[{}]", label), selected_style)
                } else {
                    Span::raw(format!(" {} ", label))
                }
            };
            lines.push(Line::from(vec![
                pick(PairChoice::First, TLX_FACTORS[a].1),
                Span::raw("   vs   "),
                pick(PairChoice::Second, TLX_FACTORS[b].1),
            ]));
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                "(←/1) left / (→/2) right / (backspace) back / (enter) next",
                italic_style,
            ));
        }
    }

    if let Some(status) = &app.status {
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            status.as_str(),
            Style::default().fg(Color::Yellow),
        ));
    }

    let height = lines.len() as u16;
    Paragraph::new(lines)
        .alignment(Alignment::Left)
        .render(centered(area, height), buf);
}

fn render_done<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let lines = vec![
        Line::styled("thank you", Style::default().add_modifier(Modifier::BOLD)),
        Line::raw(""),
        export_line(app.results_path.as_deref(), None),
        export_line(app.survey_path.as_deref(), None),
        Line::raw(""),
        Line::styled(
            "press any key to exit",
            Style::default().add_modifier(Modifier::ITALIC),
        ),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(centered(area, 6), buf);
}

fn export_line<'a>(path: Option<&std::path::Path>, status: Option<&'a str>) -> Line<'a> {
    match (path, status) {
        (Some(path), _) => Line::styled(
            format!("saved {}", path.display()),
            Style::default().fg(Color::Green),
        ),
        (None, Some(status)) => Line::styled(status, Style::default().fg(Color::Yellow)),
        (None, None) => Line::raw(""),
    }
}

fn centered(area: Rect, height: u16) -> Rect {
    let height = height.min(area.height);
    Rect {
        y: area.y + (area.height - height) / 2,
        height,
        ..area
    }
}

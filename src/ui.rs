use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use replog::clock::format_elapsed;
use replog::items::{ItemKey, SessionItem};
use replog::session::Exercise;

use crate::{App, Mode};

const HORIZONTAL_MARGIN: u16 = 3;
const VERTICAL_MARGIN: u16 = 1;
const NAME_COL_WIDTH: usize = 28;

fn pad_name(name: &str) -> String {
    let width = name.width();
    if width >= NAME_COL_WIDTH {
        name.to_string()
    } else {
        format!("{}{}", name, " ".repeat(NAME_COL_WIDTH - width))
    }
}

fn set_summary(exercise: &Exercise) -> String {
    match exercise.sets.last() {
        Some(set) => format!(
            "{} sets · last {:.1}kg × {}",
            exercise.sets.len(),
            set.weight_kg,
            set.reps
        ),
        None => "no sets".to_string(),
    }
}

fn exercise_line<'a>(app: &App, exercise: &Exercise, indent: &'a str, style: Style) -> Line<'a> {
    let done = if exercise.is_complete { "[x]" } else { "[ ]" };
    Line::from(vec![
        Span::raw(indent.to_string()),
        Span::styled(format!("{done} "), style),
        Span::styled(pad_name(&exercise.name), style),
        Span::styled(set_summary(exercise), style.add_modifier(Modifier::DIM)),
        Span::raw(if app.engine.rest_owner() == Some(&ItemKey::Exercise(exercise.id.clone())) {
            "  ⏱"
        } else {
            ""
        }),
    ])
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let dim = Style::default().add_modifier(Modifier::DIM);
        let green = Style::default().fg(Color::Green);
        let yellow = Style::default().fg(Color::Yellow);
        let magenta = Style::default().fg(Color::Magenta);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints(
                [
                    Constraint::Length(2), // header
                    Constraint::Min(4),    // item list
                    Constraint::Length(2), // rest timer + status
                    Constraint::Length(2), // input / key help
                ]
                .as_ref(),
            )
            .split(area);

        // header: session clock
        let elapsed = format_elapsed(self.engine.session_duration_secs());
        let header = Paragraph::new(Line::from(vec![
            Span::styled("replog ", bold.fg(Color::Magenta)),
            Span::styled(format!("session {elapsed}"), dim),
        ]));
        header.render(chunks[0], buf);

        // item list
        let items = self.engine.items();
        let progression = self.engine.progression();
        let focus = self.engine.focus();
        let mut lines: Vec<Line> = Vec::new();
        for (idx, item) in items.iter().enumerate() {
            let key = item.key();
            let selected = idx == self.selected;
            let marker = if Some(&key) == progression.as_ref() {
                "› "
            } else if self.engine.flow().is_skipped(&key) {
                "~ "
            } else {
                "  "
            };
            let mut style = if item.is_complete() {
                green
            } else if Some(&key) == focus.as_ref() {
                yellow.patch(bold)
            } else {
                Style::default()
            };
            if selected {
                style = style.add_modifier(Modifier::REVERSED);
            }

            match item {
                SessionItem::Single { exercise_id, .. } => {
                    let exercise = self.engine.session().exercise(exercise_id).unwrap();
                    let mut line = exercise_line(self, exercise, "", style);
                    line.spans.insert(0, Span::styled(marker, magenta));
                    lines.push(line);
                }
                SessionItem::Superset {
                    group_id,
                    exercise_ids,
                    ..
                } => {
                    let owned = self.engine.rest_owner() == Some(&ItemKey::Group(group_id.clone()));
                    lines.push(Line::from(vec![
                        Span::styled(marker, magenta),
                        Span::styled("superset", style.patch(bold)),
                        Span::raw(if owned { "  ⏱" } else { "" }),
                    ]));
                    for id in exercise_ids {
                        let exercise = self.engine.session().exercise(id).unwrap();
                        lines.push(exercise_line(self, exercise, "    ", style));
                    }
                }
            }
        }
        if lines.is_empty() {
            lines.push(Line::from(Span::styled(
                "no exercises yet — press 'a' to add one",
                dim,
            )));
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(chunks[1], buf);

        // rest timer + status line
        let mut status_spans = Vec::new();
        if let Some(secs) = self.engine.rest_elapsed_secs() {
            status_spans.push(Span::styled(
                format!("rest {}", format_elapsed(secs)),
                yellow.patch(bold),
            ));
        }
        if let Some(err) = self.engine.last_save_error() {
            status_spans.push(Span::styled(format!("  save failed: {err}"), Style::default().fg(Color::Red)));
        }
        if let Some(msg) = &self.status {
            status_spans.push(Span::styled(format!("  {msg}"), dim));
        }
        Paragraph::new(Line::from(status_spans)).render(chunks[2], buf);

        // input prompt or key help
        let footer = match &self.mode {
            Mode::AddExercise => Line::from(vec![
                Span::styled("add exercise: ", bold),
                Span::raw(self.input.clone()),
                Span::styled("▏", dim),
            ]),
            Mode::LogSet => Line::from(vec![
                Span::styled("log set (kg x reps, comma per member): ", bold),
                Span::raw(self.input.clone()),
                Span::styled("▏", dim),
            ]),
            Mode::Browse => Line::from(Span::styled(
                "a add · ⏎ log set · c complete · o reopen · s skip · d defer · g pair · u ungroup · J/K move · x del set · D remove · r dismiss · f finish · q quit",
                dim,
            )),
        };
        Paragraph::new(footer)
            .alignment(Alignment::Left)
            .render(chunks[3], buf);
    }
}

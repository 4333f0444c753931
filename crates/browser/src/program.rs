// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Wires [`Model`] into the teacher's [`tui::Program`]/[`tui::run`] event
//! loop, generalized from its original inline progress-bar use case to a
//! full-screen browser (spec §4.6).

use crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use tui::{Frame, Program};

use crate::announce::AnnounceSink;
use crate::model::{Command, Focus, Model};

/// A single UI event: either a key the user pressed, or background work
/// completing.
pub enum Message {
    Key(KeyCode),
    InstallFinished(String),
}

/// The [`tui::Program`] implementation driving the browser. Holds the pure
/// [`Model`] plus a slot for the last background-completion message, so
/// [`Program::draw`] can show install progress/results.
pub struct BrowserProgram<A: AnnounceSink> {
    pub model: Model<A>,
    pub last_event: Option<String>,
}

impl<A: AnnounceSink> BrowserProgram<A> {
    pub fn new(model: Model<A>) -> Self {
        Self { model, last_event: None }
    }

    /// Translate a raw terminal event into a [`Message`], or `None` for
    /// events the browser does not react to (e.g. resize, mouse).
    pub fn translate(event: Event) -> Option<Message> {
        match event {
            Event::Key(KeyEvent { code, .. }) => Some(Message::Key(code)),
            _ => None,
        }
    }

    /// Apply a key press, returning any [`Command`] the runtime glue should
    /// act on as an exclusive background task.
    pub fn handle_key(&mut self, code: KeyCode) -> Option<Command> {
        self.model.handle_key(code)
    }
}

impl<A: AnnounceSink> Program for BrowserProgram<A> {
    type Message = Message;

    fn update(&mut self, message: Message) {
        match message {
            Message::Key(code) => {
                // Background commands are surfaced by `handle_key`'s return
                // value to the runtime glue that owns the executor; the
                // `Program` trait itself only updates in-memory state.
                let _ = self.model.handle_key(code);
            }
            Message::InstallFinished(summary) => self.last_event = Some(summary),
        }
    }

    fn draw(&self, frame: &mut Frame<'_>) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        draw_list(self, frame, chunks[0]);
        draw_status(self, frame, chunks[1]);

        match self.model.focus {
            Focus::HelpOverlay => draw_help(frame, area),
            Focus::ConfirmationDialog => draw_confirmation(self, frame, area),
            Focus::ErrorModal => draw_error(self, frame, area),
            Focus::SearchInput | Focus::List => {}
        }
    }
}

fn draw_list<A: AnnounceSink>(program: &BrowserProgram<A>, frame: &mut Frame<'_>, area: Rect) {
    let items: Vec<ListItem> = program
        .model
        .visible()
        .iter()
        .map(|resource| {
            let marker = if program.model.selection.contains(&resource.id) { "[x]" } else { "[ ]" };
            ListItem::new(format!("{marker} {} — {}", resource.id, resource.name))
        })
        .collect();

    let title = if program.model.focus == Focus::SearchInput {
        format!("Resources (search: {}_)", program.model.search_query)
    } else {
        "Resources".to_string()
    };

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title)).highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    if !program.model.visible().is_empty() {
        state.select(Some(program.model.cursor));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_status<A: AnnounceSink>(program: &BrowserProgram<A>, frame: &mut Frame<'_>, area: Rect) {
    let line = format!("{} | {} | sort {:?}/{:?}", program.model.status_line(), program.model.selection_status(), program.model.sort.field, program.model.sort.direction);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_help(frame: &mut Frame<'_>, area: Rect) {
    let help = "/ search  Space select  a select-all  i install  s sort  S direction  ? help  q quit  Esc close";
    frame.render_widget(Paragraph::new(help).block(Block::default().borders(Borders::ALL).title("Help")), centered(area));
}

fn draw_confirmation<A: AnnounceSink>(program: &BrowserProgram<A>, frame: &mut Frame<'_>, area: Rect) {
    let Some(plan) = &program.model.pending_plan else { return };
    let recommended_state = if program.model.include_recommended { "include (r to exclude)" } else { "exclude (r to include)" };
    let body = format!(
        "Install {}\nrequired: {}\nrecommended: {} [{}]\nalready installed: {}\nmissing: {}\n\nEnter to confirm, Esc to cancel",
        plan.target,
        plan.order.len(),
        plan.recommended.len(),
        recommended_state,
        plan.already_installed.len(),
        plan.missing.len()
    );
    frame.render_widget(Paragraph::new(body).block(Block::default().borders(Borders::ALL).title("Confirm install")), centered(area));
}

fn draw_error<A: AnnounceSink>(program: &BrowserProgram<A>, frame: &mut Frame<'_>, area: Rect) {
    let message = program.model.error.as_deref().unwrap_or("unknown error");
    frame.render_widget(Paragraph::new(message).block(Block::default().borders(Borders::ALL).title("Error (Esc to dismiss)")), centered(area));
}

fn centered(area: Rect) -> Rect {
    let width = area.width.min(60);
    let height = area.height.min(10);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

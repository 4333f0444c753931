// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io::{self, stdout, Stdout};
use std::time::Duration;

use ratatui::prelude::CrosstermBackend;
use ratatui::text::Line;
use ratatui::widgets::{Paragraph, Widget};
use ratatui::{Terminal, TerminalOptions, Viewport as RatatuiViewport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::Program;

/// How much of the terminal a running [`Program`] takes over.
pub enum Viewport {
    /// Take over the full alternate screen (the interactive browser).
    Fullscreen,
    /// Render in a fixed number of lines at the cursor (progress bars).
    Inline(u16),
}

/// Drive a [`Program`] to completion, handing the caller a [`Handle`] to push
/// messages and print interstitial lines from a background task.
///
/// `spawn` receives the [`Handle`] and is run on a background task; `run`
/// returns once that task's future resolves.
pub async fn run<P, T, F, Fut>(mut program: P, viewport: Viewport, spawn: F) -> io::Result<T>
where
    P: Program + Send + 'static,
    P::Message: Send + 'static,
    T: Send + 'static,
    F: FnOnce(Handle<P::Message>) -> Fut,
    Fut: std::future::Future<Output = T> + Send + 'static,
{
    let fullscreen = matches!(viewport, Viewport::Fullscreen);
    let mut terminal = setup_terminal(viewport)?;

    terminal.draw(|frame| program.draw(frame))?;

    let (sender, mut receiver) = mpsc::unbounded_channel();
    let handle = Handle { sender };

    let mut task: JoinHandle<T> = tokio::spawn(spawn(handle));

    let mut ticker = tokio::time::interval(Duration::from_millis(1000 / 60));

    let result = loop {
        tokio::select! {
            biased;

            joined = &mut task => {
                let value = joined.unwrap_or_else(|err| std::panic::resume_unwind(err.into_panic()));
                break value;
            }
            _ = ticker.tick() => {
                let mut print = vec![];

                while let Ok(event) = receiver.try_recv() {
                    match event {
                        Event::Message(message) => program.update(message),
                        Event::Print(content) => print.push(content),
                    }
                }

                if !print.is_empty() && !fullscreen {
                    let lines = print
                        .iter()
                        .flat_map(|content| content.lines())
                        .map(Line::from)
                        .collect::<Vec<_>>();
                    let num_lines = lines.len();
                    let paragraph = Paragraph::new(lines);

                    terminal.insert_before(num_lines as u16, |buf| paragraph.clone().render(buf.area, buf))?;
                }

                terminal.draw(|frame| program.draw(frame))?;
            }
        }
    };

    teardown_terminal(&mut terminal, fullscreen)?;

    Ok(result)
}

fn setup_terminal(viewport: Viewport) -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    if let Viewport::Fullscreen = viewport {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(stdout(), crossterm::terminal::EnterAlternateScreen)?;
    }

    let ratatui_viewport = match viewport {
        Viewport::Fullscreen => RatatuiViewport::Fullscreen,
        Viewport::Inline(lines) => RatatuiViewport::Inline(lines),
    };

    Terminal::with_options(CrosstermBackend::new(stdout()), TerminalOptions { viewport: ratatui_viewport })
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>, fullscreen: bool) -> io::Result<()> {
    terminal.show_cursor()?;
    if fullscreen {
        crossterm::execute!(stdout(), crossterm::terminal::LeaveAlternateScreen)?;
        crossterm::terminal::disable_raw_mode()?;
    } else {
        terminal.clear()?;
    }
    Ok(())
}

/// A clonable, thread-safe handle that lets background tasks push messages
/// and interstitial output into the running [`Program`].
pub struct Handle<Message> {
    sender: mpsc::UnboundedSender<Event<Message>>,
}

impl<Message> Clone for Handle<Message> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

impl<Message> Handle<Message> {
    pub fn print(&self, content: String) {
        let _ = self.sender.send(Event::Print(content));
    }

    pub fn update(&self, message: Message) {
        let _ = self.sender.send(Event::Message(message));
    }
}

enum Event<Message> {
    Message(Message),
    Print(String),
}

// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The interactive browser (spec §4.6): a reactive [`Model`] rendered
//! through the teacher's [`tui::Program`]/[`tui::run`] event loop, with a
//! single exclusive worker slot for the install flow — a new install
//! request cancels whichever one is still in flight (spec §5).

pub mod announce;
pub mod model;
mod program;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crossterm::event;
use install::{InstallOptions, Installer};
use log::{debug, warn};
use model::Resource;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tui::{Handle, Viewport};

pub use crate::announce::{AnnounceSink, LoggingSink};
pub use crate::model::{Command, Focus, Model};
pub use crate::program::{BrowserProgram, Message};

/// Launch the full-screen browser over `resources`, writing installs under
/// `install_root`. Returns once the user quits.
pub async fn run_browser(resources: Vec<Resource>, install_root: PathBuf) -> std::io::Result<()> {
    let model = Model::new(resources, LoggingSink);
    let program = BrowserProgram::new(model);
    let focus_mirror = Arc::new(Mutex::new(Focus::List));
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let installer = Arc::new(Installer::new(install_root));

    let program = ProgramWithBridge { inner: program, cmd_tx, focus_mirror: focus_mirror.clone() };

    tui::run(program, Viewport::Fullscreen, move |handle| event_loop(handle, cmd_rx, installer, focus_mirror)).await
}

/// Wraps [`BrowserProgram`] so every `update` also mirrors the resulting
/// focus and forwards any emitted [`Command`] onto `cmd_tx`, without the
/// `tui::Program` trait itself needing to know about either.
struct ProgramWithBridge<A: AnnounceSink> {
    inner: BrowserProgram<A>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    focus_mirror: Arc<Mutex<Focus>>,
}

impl<A: AnnounceSink> tui::Program for ProgramWithBridge<A> {
    type Message = Message;

    fn update(&mut self, message: Message) {
        if let Message::Key(code) = message {
            if let Some(command) = self.inner.handle_key(code) {
                let _ = self.cmd_tx.send(command);
            }
        } else {
            self.inner.update(message);
        }
        *self.focus_mirror.lock().expect("focus mirror poisoned") = self.inner.model.focus;
    }

    fn draw(&self, frame: &mut tui::Frame<'_>) {
        self.inner.draw(frame);
    }
}

/// The spawn-closure task: reads keyboard input and forwards it as
/// [`Message`]s, and owns the single exclusive install worker slot.
async fn event_loop(handle: Handle<Message>, mut cmd_rx: mpsc::UnboundedReceiver<Command>, installer: Arc<Installer>, focus_mirror: Arc<Mutex<Focus>>) {
    let mut current_install: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            key = read_key() => {
                let Some(code) = key else { continue };
                let focus = *focus_mirror.lock().expect("focus mirror poisoned");
                if matches!(code, event::KeyCode::Char('q')) && focus == Focus::List {
                    break;
                }
                handle.update(Message::Key(code));
            }
            Some(command) = cmd_rx.recv() => {
                if let Some(previous) = current_install.take() {
                    previous.abort();
                }
                current_install = Some(spawn_install(command, installer.clone(), handle.clone()));
            }
        }
    }

    if let Some(task) = current_install {
        task.abort();
    }
}

fn spawn_install(command: Command, installer: Arc<Installer>, handle: Handle<Message>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Command::RunInstall { plan, include_recommended } = command;
        let options = InstallOptions { parallel: true, ..Default::default() };
        let mut outcomes = installer.install_plan(&plan, &options).await;

        if include_recommended && !plan.recommended.is_empty() {
            let futures = plan.recommended.iter().map(|resource| installer.install(resource, &options));
            outcomes.extend(futures_util::future::join_all(futures).await);
        }

        let succeeded = outcomes.iter().filter(|o| matches!(o.status, install::InstallStatus::Installed)).count();
        let failed = outcomes.len() - succeeded;
        debug!("install for {} finished: {succeeded} ok, {failed} failed", plan.target);
        handle.update(Message::InstallFinished(format!("{succeeded} installed, {failed} failed")));
    })
}

/// A blocking `crossterm::event::read` wrapped in `spawn_blocking`, polled
/// at a short interval so the surrounding `select!` stays responsive to
/// new install commands while waiting on terminal input.
async fn read_key() -> Option<event::KeyCode> {
    loop {
        let ready = tokio::task::spawn_blocking(|| event::poll(std::time::Duration::from_millis(50))).await;
        match ready {
            Ok(Ok(true)) => match event::read() {
                Ok(event::Event::Key(event::KeyEvent { code, .. })) => return Some(code),
                Ok(_) => continue,
                Err(e) => {
                    warn!("terminal read error: {e}");
                    return None;
                }
            },
            Ok(Ok(false)) => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
            Ok(Err(e)) => {
                warn!("terminal poll error: {e}");
                return None;
            }
            Err(e) => {
                warn!("poll task panicked: {e}");
                return None;
            }
        }
    }
}

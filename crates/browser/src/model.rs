// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The browser's reactive model (spec §4.6): a single record holding every
//! orthogonal piece of UI state, updated synchronously before any
//! asynchronous work is dispatched (spec §5 "the UI update function is not
//! a suspension point").

use std::collections::{HashMap, HashSet};

use crossterm::event::KeyCode;
use model::{InstallPlan, Kind, Resource, ResourceId};
use resolve::Resolver;
use search::{Index, Mode, DEFAULT_FUZZY_THRESHOLD};

use crate::announce::AnnounceSink;

/// Which part of the screen currently owns keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    SearchInput,
    HelpOverlay,
    ConfirmationDialog,
    ErrorModal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Type,
    Updated,
}

impl SortField {
    fn next(self) -> SortField {
        match self {
            SortField::Name => SortField::Type,
            SortField::Type => SortField::Updated,
            SortField::Updated => SortField::Name,
        }
    }

    fn default_direction(self) -> SortDirection {
        match self {
            SortField::Updated => SortDirection::Desc,
            SortField::Name | SortField::Type => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn toggled(self) -> SortDirection {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for Sort {
    fn default() -> Self {
        Sort { field: SortField::Name, direction: SortDirection::Asc }
    }
}

/// Work the runtime glue should start as an *exclusive* background task
/// (spec §4.6, §5): a new command of the same kind supersedes any task
/// already in flight.
#[derive(Debug)]
pub enum Command {
    RunInstall { plan: Box<InstallPlan>, include_recommended: bool },
}

/// The browser's full reactive state (spec §4.6 "States (orthogonal
/// modes)").
pub struct Model<A: AnnounceSink> {
    resources: Vec<Resource>,
    by_key: HashMap<(Kind, ResourceId), Resource>,
    index: Index,
    visible: Vec<Resource>,

    pub focus: Focus,
    pub filter: Option<Kind>,
    pub sort: Sort,
    pub search_query: String,
    pub selection: HashSet<ResourceId>,
    pub cursor: usize,

    updated_sort_used: bool,
    pub pending_plan: Option<InstallPlan>,
    pub include_recommended: bool,
    pub error: Option<String>,

    announcer: A,
}

impl<A: AnnounceSink> Model<A> {
    pub fn new(resources: Vec<Resource>, announcer: A) -> Self {
        let by_key = resources.iter().map(|r| ((r.kind, r.id.clone()), r.clone())).collect();
        let mut index = Index::new();
        index.rebuild(resources.iter().cloned());
        let mut model = Model {
            resources,
            by_key,
            index,
            visible: Vec::new(),
            focus: Focus::List,
            filter: None,
            sort: Sort::default(),
            search_query: String::new(),
            selection: HashSet::new(),
            cursor: 0,
            updated_sort_used: false,
            pending_plan: None,
            include_recommended: true,
            error: None,
            announcer,
        };
        model.recompute();
        model
    }

    pub fn visible(&self) -> &[Resource] {
        &self.visible
    }

    /// "X match(es)" / "X <kind>s" / "X resources" (spec §4.6 "Status
    /// line").
    pub fn status_line(&self) -> String {
        let count = self.visible.len();
        if !self.search_query.is_empty() {
            format!("{count} match{}", if count == 1 { "" } else { "es" })
        } else if let Some(kind) = self.filter {
            format!("{count} {kind}{}", if count == 1 { "" } else { "s" })
        } else {
            format!("{count} resources")
        }
    }

    pub fn selection_status(&self) -> String {
        if self.selection.is_empty() {
            "0 selected".to_string()
        } else {
            format!("{} / {} selected", self.selection.len(), self.resources.len())
        }
    }

    /// Recompute `visible` from `resources` + `filter` + `search_query`,
    /// then re-apply the current sort, then clamp the cursor. Called after
    /// every state-changing key so the invariant "visible reflects current
    /// filter/search/sort" always holds before the next render (spec §4.6
    /// "Search semantics": typing triggers a smart search; the current sort
    /// persists and is re-applied to the filtered row set).
    fn recompute(&mut self) {
        let matches: Option<HashSet<ResourceId>> = if self.search_query.trim().is_empty() {
            None
        } else {
            let hits = self.index.search(&self.search_query, Mode::Smart, self.resources.len(), DEFAULT_FUZZY_THRESHOLD);
            Some(hits.into_iter().map(|hit| hit.resource.id).collect())
        };

        let mut rows: Vec<Resource> = self
            .resources
            .iter()
            .filter(|r| self.filter.map_or(true, |k| r.kind == k))
            .filter(|r| matches.as_ref().map_or(true, |ids| ids.contains(&r.id)))
            .cloned()
            .collect();

        sort_resources(&mut rows, self.sort);
        self.visible = rows;
        self.cursor = self.cursor.min(self.visible.len().saturating_sub(1));
    }

    /// Dispatch a single key press. Returns a [`Command`] when the key
    /// triggers background work; the model's own state is already fully
    /// updated by the time this returns (spec §5 ordering guarantee).
    pub fn handle_key(&mut self, code: KeyCode) -> Option<Command> {
        if self.focus == Focus::HelpOverlay || self.focus == Focus::ErrorModal {
            if matches!(code, KeyCode::Esc) {
                self.focus = Focus::List;
                self.announcer.announce("closed overlay");
            }
            return None;
        }

        if self.focus == Focus::ConfirmationDialog {
            return self.handle_confirmation_key(code);
        }

        if self.focus == Focus::SearchInput {
            return self.handle_search_key(code);
        }

        self.handle_list_key(code)
    }

    fn handle_list_key(&mut self, code: KeyCode) -> Option<Command> {
        match code {
            KeyCode::Char('/') => {
                self.focus = Focus::SearchInput;
                self.announcer.announce("search input focused");
            }
            KeyCode::Esc => {
                self.search_query.clear();
                self.focus = Focus::List;
                self.recompute();
                self.announcer.announce("search cleared");
            }
            KeyCode::Char(' ') => self.toggle_selection_at_cursor(),
            KeyCode::Char('a') => self.select_all_visible(),
            KeyCode::Char('i') => return self.start_install_flow(),
            KeyCode::Char('s') => self.cycle_sort_field(),
            KeyCode::Char('S') => self.toggle_sort_direction(),
            KeyCode::Char('?') => {
                self.focus = Focus::HelpOverlay;
                self.announcer.announce("help opened");
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            _ => {}
        }
        None
    }

    fn handle_search_key(&mut self, code: KeyCode) -> Option<Command> {
        match code {
            KeyCode::Esc => {
                self.search_query.clear();
                self.focus = Focus::List;
                self.recompute();
                self.announcer.announce("search cleared");
            }
            KeyCode::Enter => {
                self.focus = Focus::List;
            }
            KeyCode::Backspace => {
                self.search_query.pop();
                self.recompute();
            }
            KeyCode::Char(c) => {
                self.search_query.push(c);
                self.recompute();
            }
            _ => {}
        }
        None
    }

    fn handle_confirmation_key(&mut self, code: KeyCode) -> Option<Command> {
        match code {
            KeyCode::Esc => {
                self.pending_plan = None;
                self.focus = Focus::List;
                self.announcer.announce("install cancelled");
                None
            }
            KeyCode::Char('r') => {
                self.include_recommended = !self.include_recommended;
                self.announcer.announce(if self.include_recommended { "recommended dependencies included" } else { "recommended dependencies excluded" });
                None
            }
            KeyCode::Enter => {
                let plan = self.pending_plan.take()?;
                let include_recommended = self.include_recommended;
                self.focus = Focus::List;
                self.announcer.announce(&format!("installing {} resource(s)", plan.order.len()));
                Some(Command::RunInstall { plan: Box::new(plan), include_recommended })
            }
            _ => None,
        }
    }

    fn toggle_selection_at_cursor(&mut self) {
        let Some(resource) = self.visible.get(self.cursor) else { return };
        let id = resource.id.clone();
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
        self.announcer.announce(&self.selection_status());
    }

    fn select_all_visible(&mut self) {
        for resource in &self.visible {
            self.selection.insert(resource.id.clone());
        }
        self.announcer.announce(&self.selection_status());
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.visible.is_empty() {
            return;
        }
        let len = self.visible.len() as isize;
        let next = (self.cursor as isize + delta).clamp(0, len - 1);
        self.cursor = next as usize;
    }

    /// `s` cycles name -> type -> updated -> name, preserving direction
    /// across cycles *unless* the field becomes `updated` for the first
    /// time this session, in which case direction defaults to `desc`
    /// (spec §4.6 "Key bindings").
    fn cycle_sort_field(&mut self) {
        let next_field = self.sort.field.next();
        let direction = if next_field == SortField::Updated && !self.updated_sort_used {
            self.updated_sort_used = true;
            SortField::Updated.default_direction()
        } else {
            self.sort.direction
        };
        self.sort = Sort { field: next_field, direction };
        self.recompute();
        self.announcer.announce(&format!("sorted by {next_field:?}"));
    }

    fn toggle_sort_direction(&mut self) {
        self.sort.direction = self.sort.direction.toggled();
        self.recompute();
        self.announcer.announce(&format!("sort direction {:?}", self.sort.direction));
    }

    pub fn set_filter(&mut self, filter: Option<Kind>) {
        self.filter = filter;
        self.recompute();
    }

    /// Build a combined plan for the selection (or the cursor row if the
    /// selection is empty) and open the confirmation dialog.
    fn start_install_flow(&mut self) -> Option<Command> {
        let targets: Vec<ResourceId> = if self.selection.is_empty() {
            self.visible.get(self.cursor).map(|r| r.id.clone()).into_iter().collect()
        } else {
            self.selection.iter().cloned().collect()
        };

        if targets.is_empty() {
            return None;
        }

        let resolver = Resolver::new(&self.by_key);
        let mut combined: Option<InstallPlan> = None;

        for id in &targets {
            let Some(target) = self.resources.iter().find(|r| &r.id == id) else { continue };
            match resolver.resolve(target) {
                Ok(plan) => combined = Some(merge_plans(combined, plan)),
                Err(e) => {
                    self.error = Some(e.to_string());
                    self.focus = Focus::ErrorModal;
                    return None;
                }
            }
        }

        if let Some(plan) = combined {
            self.pending_plan = Some(plan);
            self.include_recommended = true;
            self.focus = Focus::ConfirmationDialog;
            self.announcer.announce("install confirmation opened");
        }

        None
    }
}

fn merge_plans(existing: Option<InstallPlan>, next: InstallPlan) -> InstallPlan {
    let Some(mut existing) = existing else { return next };

    for (level_idx, level) in next.to_install.into_iter().enumerate() {
        for resource in level {
            if !existing.order.contains(&resource.id) {
                while existing.to_install.len() <= level_idx {
                    existing.to_install.push(Vec::new());
                }
                existing.to_install[level_idx].push(resource.clone());
                existing.order.push(resource.id.clone());
            }
        }
    }
    existing.already_installed.extend(next.already_installed);
    existing.missing.extend(next.missing);
    for rec in next.recommended {
        if !existing.recommended.iter().any(|r| r.id == rec.id) {
            existing.recommended.push(rec);
        }
    }

    existing
}

fn sort_resources(rows: &mut [Resource], sort: Sort) {
    rows.sort_by(|a, b| {
        let ordering = match sort.field {
            SortField::Name => a.name.cmp(&b.name),
            SortField::Type => a.kind.to_string().cmp(&b.kind.to_string()),
            // No "updated" timestamp is tracked on `Resource` (out of
            // scope, spec §1); fall back to id so the ordering is at
            // least stable and deterministic.
            SortField::Updated => a.id.cmp(&b.id),
        };
        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use model::Source;

    use super::*;

    #[derive(Default)]
    struct NullSink;
    impl AnnounceSink for NullSink {
        fn announce(&self, _message: &str) {}
    }

    fn resource(id: &str, kind: Kind, name: &str) -> Resource {
        Resource {
            id: ResourceId::parse(id).unwrap(),
            kind,
            name: name.to_string(),
            description: format!("{name} description"),
            summary: String::new(),
            version: "v1.0.0".to_string(),
            author: None,
            file_type: ".md".to_string(),
            source: Source {
                repo: "org/repo".to_string(),
                path: String::new(),
                url: url::Url::parse("https://raw.githubusercontent.com/org/repo/main/a.md").unwrap(),
            },
            install_path: format!("agents/{id}.md"),
            metadata: Default::default(),
            required: vec![],
            recommended: vec![],
        }
    }

    fn sample() -> Model<NullSink> {
        Model::new(
            vec![
                resource("architect", Kind::Agent, "Architect"),
                resource("code-archaeologist", Kind::Agent, "Code Archaeologist"),
                resource("deploy-hook", Kind::Hook, "Deploy Hook"),
            ],
            NullSink,
        )
    }

    #[test]
    fn four_s_presses_cycle_to_type_mod_three() {
        let mut model = sample();
        for _ in 0..4 {
            model.handle_key(KeyCode::Char('s'));
        }
        assert_eq!(model.sort.field, SortField::Type);
    }

    #[test]
    fn updated_defaults_to_descending_first_time() {
        let mut model = sample();
        model.handle_key(KeyCode::Char('s')); // type
        model.handle_key(KeyCode::Char('s')); // updated
        assert_eq!(model.sort.field, SortField::Updated);
        assert_eq!(model.sort.direction, SortDirection::Desc);
    }

    #[test]
    fn direction_persists_across_non_updated_cycles() {
        let mut model = sample();
        model.handle_key(KeyCode::Char('S')); // name desc
        assert_eq!(model.sort.direction, SortDirection::Desc);
        model.handle_key(KeyCode::Char('s')); // type, direction preserved
        assert_eq!(model.sort.direction, SortDirection::Desc);
    }

    #[test]
    fn esc_clears_search_and_returns_focus_in_one_action() {
        let mut model = sample();
        model.handle_key(KeyCode::Char('/'));
        model.handle_key(KeyCode::Char('a'));
        model.handle_key(KeyCode::Char('r'));
        assert_eq!(model.focus, Focus::SearchInput);
        assert!(!model.search_query.is_empty());

        model.handle_key(KeyCode::Esc);
        assert_eq!(model.focus, Focus::List);
        assert!(model.search_query.is_empty());
        assert_eq!(model.visible().len(), 3);
    }

    #[test]
    fn space_toggles_selection_on_cursor_row() {
        let mut model = sample();
        model.handle_key(KeyCode::Char(' '));
        assert_eq!(model.selection.len(), 1);
        model.handle_key(KeyCode::Char(' '));
        assert!(model.selection.is_empty());
    }

    #[test]
    fn selection_survives_filter_change() {
        let mut model = sample();
        model.handle_key(KeyCode::Char(' '));
        assert_eq!(model.selection.len(), 1);
        model.set_filter(Some(Kind::Hook));
        assert_eq!(model.selection.len(), 1);
    }

    #[test]
    fn select_all_marks_every_visible_row() {
        let mut model = sample();
        model.handle_key(KeyCode::Char('a'));
        assert_eq!(model.selection.len(), 3);
    }

    #[test]
    fn search_filters_and_clamps_cursor() {
        let mut model = sample();
        model.cursor = 2;
        model.handle_key(KeyCode::Char('/'));
        for c in "architect".chars() {
            model.handle_key(KeyCode::Char(c));
        }
        assert_eq!(model.visible().len(), 1);
        assert_eq!(model.cursor, 0);
    }

    #[test]
    fn install_with_empty_selection_uses_cursor_row() {
        let mut model = sample();
        let command = model.handle_key(KeyCode::Char('i'));
        assert!(command.is_none());
        assert_eq!(model.focus, Focus::ConfirmationDialog);
        let plan = model.pending_plan.as_ref().unwrap();
        assert_eq!(plan.target.as_str(), "architect");
    }

    #[test]
    fn confirming_install_emits_run_install_command() {
        let mut model = sample();
        model.handle_key(KeyCode::Char('i'));
        let command = model.handle_key(KeyCode::Enter);
        assert!(matches!(command, Some(Command::RunInstall { .. })));
        assert_eq!(model.focus, Focus::List);
        assert!(model.pending_plan.is_none());
    }

    #[test]
    fn r_toggles_include_recommended_in_confirmation() {
        let mut model = sample();
        model.handle_key(KeyCode::Char('i'));
        assert!(model.include_recommended);
        model.handle_key(KeyCode::Char('r'));
        assert!(!model.include_recommended);
        let command = model.handle_key(KeyCode::Enter);
        match command {
            Some(Command::RunInstall { include_recommended, .. }) => assert!(!include_recommended),
            _ => panic!("expected RunInstall command"),
        }
    }

    #[test]
    fn cancelling_install_clears_pending_plan() {
        let mut model = sample();
        model.handle_key(KeyCode::Char('i'));
        model.handle_key(KeyCode::Esc);
        assert!(model.pending_plan.is_none());
        assert_eq!(model.focus, Focus::List);
    }

    #[test]
    fn help_overlay_always_exits_on_escape() {
        let mut model = sample();
        model.handle_key(KeyCode::Char('?'));
        assert_eq!(model.focus, Focus::HelpOverlay);
        model.handle_key(KeyCode::Esc);
        assert_eq!(model.focus, Focus::List);
    }
}

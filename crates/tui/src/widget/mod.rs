// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Reusable widgets for the browser's ratatui front end
pub use ratatui::text::Line;
pub use ratatui::widgets::Paragraph;

pub use self::progress::progress;

pub mod progress;

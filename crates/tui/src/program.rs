// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use crate::Frame;

/// Implementations need to conform with this trait to integrate with
/// [`crate::runtime::run`].
pub trait Program: Sized {
    type Message;

    /// Handle updates in response to a Message
    fn update(&mut self, message: Self::Message);

    /// Draw per the current state
    fn draw(&self, frame: &mut Frame<'_>);
}

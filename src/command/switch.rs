// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Switch command.

use crate::command::{Command, OPCODE_SET_SWITCHES};
use crate::types::Switches;

/// Writes element, pump, holiday and solenoid fields in one operation.
///
/// The device has no per-switch write, so changing one field means
/// resending all four. Build the [`Switches`] from the last reported
/// buffer to leave the other fields as they were.
///
/// # Examples
///
/// ```
/// use ubersolar_lib::command::{Command, SwitchCommand};
/// use ubersolar_lib::types::{SolenoidMode, Switches};
///
/// let cmd = SwitchCommand::new(Switches::new(true, false, false, SolenoidMode::Auto));
/// assert_eq!(cmd.to_bytes(), vec![0x06, 1, 0, 0, 2]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchCommand {
    switches: Switches,
}

impl SwitchCommand {
    /// Creates a switch command.
    #[must_use]
    pub fn new(switches: Switches) -> Self {
        Self {
            switches: switches.to_command(),
        }
    }

    /// Returns the switch buffer that will be written.
    #[must_use]
    pub fn switches(&self) -> &Switches {
        &self.switches
    }
}

impl Command for SwitchCommand {
    fn opcode(&self) -> Option<u8> {
        Some(OPCODE_SET_SWITCHES)
    }

    fn payload(&self) -> Vec<u8> {
        self.switches.fields().to_vec()
    }
}

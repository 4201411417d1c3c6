// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Clock command.

use crate::command::{Command, OPCODE_SET_TIME};
use crate::types::TimePayload;

/// Sets the device clock.
///
/// # Examples
///
/// ```
/// use ubersolar_lib::command::{Command, SetTimeCommand};
/// use ubersolar_lib::types::TimePayload;
///
/// let payload = TimePayload::from_parts(1_700_000_000, 3600).unwrap();
/// let cmd = SetTimeCommand::new(payload);
/// assert_eq!(cmd.to_hex(), "0900f153650000000000010000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetTimeCommand {
    payload: TimePayload,
}

impl SetTimeCommand {
    /// Creates a set-time command from an encoded payload.
    #[must_use]
    pub fn new(payload: TimePayload) -> Self {
        Self { payload }
    }

    /// Returns the encoded payload.
    #[must_use]
    pub fn time_payload(&self) -> &TimePayload {
        &self.payload
    }
}

impl Command for SetTimeCommand {
    fn opcode(&self) -> Option<u8> {
        Some(OPCODE_SET_TIME)
    }

    fn payload(&self) -> Vec<u8> {
        self.payload.as_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_thirteen_bytes() {
        let payload = TimePayload::from_parts(1_705_314_600, -2 * 3600).unwrap();
        let bytes = SetTimeCommand::new(payload).to_bytes();

        assert_eq!(bytes.len(), 13);
        assert_eq!(bytes[0], OPCODE_SET_TIME);
        assert_eq!(&bytes[1..9], &1_705_314_600u64.to_le_bytes());
        assert_eq!(bytes[9], 0);
        assert_eq!(bytes[10], 0xFE);
        assert_eq!(&bytes[11..], &[0, 0]);
    }
}

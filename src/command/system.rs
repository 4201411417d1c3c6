// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status and maintenance commands.

use crate::command::{Command, OPCODE_ENABLE_ACCESS_POINT};

/// Requests a status refresh.
///
/// Nothing is written: the device streams its status frames on its own once
/// notifications are enabled, so sending this command only makes sure the
/// link is up and subscribed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusRequest;

impl Command for StatusRequest {
    fn opcode(&self) -> Option<u8> {
        None
    }

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// Starts the device's Wi-Fi access point (used for firmware updates).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnableAccessPointCommand;

impl Command for EnableAccessPointCommand {
    fn opcode(&self) -> Option<u8> {
        Some(OPCODE_ENABLE_ACCESS_POINT)
    }

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_request_is_empty() {
        assert!(StatusRequest.to_bytes().is_empty());
        assert_eq!(StatusRequest.to_hex(), "");
    }

    #[test]
    fn access_point_is_single_opcode() {
        assert_eq!(EnableAccessPointCommand.to_hex(), "14");
    }
}

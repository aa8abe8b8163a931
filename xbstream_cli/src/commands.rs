// /////////////////////////////////////////////////////////////////////////////
// XBStream RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Archiver Commands
//!
//! One module per subcommand. Both commands report their work through
//! tracing with human-readable sizes.

pub mod create;
pub mod extract;

/// Formats a byte count with an appropriate decimal unit.
pub fn format_bytes(bytes: u64) -> String {
    let byte_obj = byte_unit::Byte::from_u64(bytes).get_appropriate_unit(byte_unit::UnitType::Decimal);
    format!("{:.2} {}", byte_obj.get_value(), byte_obj.get_unit())
}

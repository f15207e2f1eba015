//! `module-device-manager` extension.
//!
//! Grounded on `ext-device-manager.c`: every client entry point in the
//! original implementation just logs `"Not Implemented"` and returns
//! nothing, because this extension was never ported to the
//! pipewire-pulse server module. This stub keeps the same behavior: any
//! sub-command fails with `NotSupported`.

use crate::protocol::PulseError;

/// Handles any `module-device-manager` sub-command. Always unsupported.
pub fn handle(_subcommand: u32) -> Result<(), PulseError> {
    Err(PulseError::NotSupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subcommand_is_unsupported() {
        for subcommand in 0..6 {
            assert_eq!(handle(subcommand), Err(PulseError::NotSupported));
        }
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output name generation.
//
// Every output filename is built from a generated stem so concurrent
// requests never collide on disk. The generator is injected rather than
// called statically so tests can pin filenames deterministically.

use uuid::Uuid;

/// Produces collision-resistant name stems for output files.
pub trait NameGenerator: Send + Sync {
    /// A stem unique across requests, containing only filename-safe
    /// characters.
    fn unique_stem(&self) -> String;
}

/// Production generator backed by UUID v4.
pub struct UuidNames;

impl NameGenerator for UuidNames {
    fn unique_stem(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_are_unique_and_filename_safe() {
        let names = UuidNames;
        let a = names.unique_stem();
        let b = names.unique_stem();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}

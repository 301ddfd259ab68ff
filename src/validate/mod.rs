// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! "Is this command complete yet?" probes.
//!
//! The coordinator never evaluates anything; it only asks a validator whether the buffered text
//! would parse. Hosts with access to the real parser plug it in through [`CommandValidator`];
//! [`DelimiterValidator`] is the built-in structural checker.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

mod delimiters;

pub use delimiters::{DelimiterValidator, ScanError};

/// Outcome of probing buffered input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    /// More input may still complete the command.
    Incomplete,
    /// No continuation can make this parse.
    Invalid,
}

pub trait CommandValidator: Send + Sync + 'static {
    /// Returns `false` for any parse error, including "needs more input".
    fn is_complete(&self, text: &str) -> bool;

    /// Validators that cannot tell a dead end from a partial command report every rejection as
    /// [`Completeness::Incomplete`].
    fn check(&self, text: &str) -> Completeness {
        if self.is_complete(text) {
            Completeness::Complete
        } else {
            Completeness::Incomplete
        }
    }
}

impl<F> CommandValidator for F
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    fn is_complete(&self, text: &str) -> bool {
        self(text)
    }
}

fn runtime_reference_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"#(PID|Reference|Port|Function)<").expect("hard-coded marker regex is valid")
    })
}

/// Strips the leading `#` from printed runtime references such as `#PID<0.110.0>`.
///
/// Those literals are not re-parseable input, but they are common paste targets and the `#`
/// would otherwise turn the rest of the line into a comment.
pub fn strip_reference_markers(text: &str) -> Cow<'_, str> {
    runtime_reference_marker().replace_all(text, "$1<")
}

#[cfg(test)]
mod tests {
    use super::{strip_reference_markers, CommandValidator, Completeness};

    #[test]
    fn strips_only_reference_markers() {
        assert_eq!(
            strip_reference_markers("send(#PID<0.110.0>, :ping) # note"),
            "send(PID<0.110.0>, :ping) # note"
        );
        assert_eq!(
            strip_reference_markers("ref = #Reference<0.1.2.3>"),
            "ref = Reference<0.1.2.3>"
        );
        assert_eq!(strip_reference_markers("x = 1 # PID<"), "x = 1 # PID<");
    }

    #[test]
    fn closures_are_validators() {
        let validator = |text: &str| text.ends_with(';');
        assert!(validator.is_complete("a;"));
        assert!(!CommandValidator::is_complete(&validator, "a"));
        assert_eq!(validator.check("a"), Completeness::Incomplete);
    }
}

//! Terminal palette for human-readable output.
//!
//! Plain ANSI bright colors so every terminal renders them. Whether colors
//! are used at all is decided by the caller (see
//! [`HumanFormatter`](crate::output::HumanFormatter)), never here.

use colored::{ColoredString, Colorize};

use crate::snapshot::DomainStatus;

pub trait PaletteExt {
    fn success(&self) -> ColoredString;
    fn warning(&self) -> ColoredString;
    fn failure(&self) -> ColoredString;
    fn accent(&self) -> ColoredString;
    fn heading(&self) -> ColoredString;
    fn muted(&self) -> ColoredString;
    fn plain(&self) -> ColoredString;

    /// Color matching the urgency of a domain status.
    fn for_status(&self, status: DomainStatus) -> ColoredString {
        match status {
            DomainStatus::Active => self.success(),
            DomainStatus::ExpiringSoon => self.warning(),
            DomainStatus::Expired | DomainStatus::Error => self.failure(),
            DomainStatus::Unknown => self.muted(),
        }
    }
}

impl<S: AsRef<str>> PaletteExt for S {
    fn success(&self) -> ColoredString {
        self.as_ref().bright_green()
    }

    fn warning(&self) -> ColoredString {
        self.as_ref().bright_yellow()
    }

    fn failure(&self) -> ColoredString {
        self.as_ref().bright_red()
    }

    fn accent(&self) -> ColoredString {
        self.as_ref().bright_cyan()
    }

    fn heading(&self) -> ColoredString {
        self.as_ref().bright_blue()
    }

    // Gray
    fn muted(&self) -> ColoredString {
        self.as_ref().bright_black()
    }

    fn plain(&self) -> ColoredString {
        self.as_ref().bright_white()
    }
}

//! What the UI layer hears from the core: render triggers and notices.

use std::fmt;

/// Human-readable condition worth showing to the user. None of them are fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Remote unreachable; the locally cached copy is shown.
    UsingCachedData,
    /// Remote unreachable and nothing cached.
    LoadFailed,
    /// Write failed for a transient reason; the change is only local.
    SavedLocallyOnly,
    /// No or rejected credential; the UI should offer sign-in.
    SignInRequired,
    /// Someone else wrote the document since our last pull.
    VersionConflict,
    Refreshed,
    NewDataAvailable,
    LegacyFixed(usize),
}

impl Notice {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notice::LoadFailed | Notice::SavedLocallyOnly | Notice::SignInRequired | Notice::VersionConflict
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::UsingCachedData => f.write_str("Using cached data. Could not connect to the shared repository."),
            Notice::LoadFailed => f.write_str("Error loading data. Please try again later."),
            Notice::SavedLocallyOnly => f.write_str("Could not save to the shared repository. Data stored locally for now."),
            Notice::SignInRequired => f.write_str("Sign in to save changes. Data stored locally for now."),
            Notice::VersionConflict => f.write_str(
                "The shared list changed since it was loaded. Your change is stored locally; refresh to see the latest data.",
            ),
            Notice::Refreshed => f.write_str("Data refreshed from the shared repository"),
            Notice::NewDataAvailable => f.write_str("New data available. Refreshed!"),
            Notice::LegacyFixed(n) => {
                write!(f, "Fixed {n} legacy business entries. You can now delete them if needed.")
            }
        }
    }
}

/// Broadcast to subscribers of a `BusinessRegistry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// Local state may have changed; redraw.
    Render,
    Notice(Notice),
}

/// Where a mutation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Mutating,
    Persisting,
}

/// Operating mode of the device
///
/// Starts at [`SystemMode::Running`] on every power-up. The only transition
/// is Running → Locked, and Locked holds until the next reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SystemMode {
    /// Normal operation, liveness presses are accepted
    #[default]
    Running,
    /// Check-ins exhausted, only the fault blink remains
    Locked,
}

impl SystemMode {
    pub const fn is_locked(self) -> bool {
        matches!(self, Self::Locked)
    }

    /// Get a short label for display
    pub const fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Locked => "locked",
        }
    }
}

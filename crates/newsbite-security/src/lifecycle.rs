//! App lifecycle states reported by the host

use crate::Error;
use std::fmt;
use std::str::FromStr;

/// Host application lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppLifecycleState {
    /// In the foreground and receiving input
    Active,
    /// Visible but not receiving input (app switcher, incoming call)
    Inactive,
    /// Not visible
    Background,
}

impl AppLifecycleState {
    /// Active is the only foreground state; inactive counts as backgrounded
    pub fn is_foreground(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Lowercase name as reported by the host
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Background => "background",
        }
    }
}

impl fmt::Display for AppLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppLifecycleState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "background" => Ok(Self::Background),
            other => Err(Error::Config(format!("Unknown lifecycle state: {}", other))),
        }
    }
}

/// Edge between two lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTransition {
    /// Foreground to inactive/background
    EnteredBackground,
    /// Inactive/background to active
    EnteredForeground,
    /// No foreground boundary crossed (including inactive to background)
    Unchanged,
}

impl LifecycleTransition {
    /// Classify the move from `previous` to `next`
    pub fn classify(previous: AppLifecycleState, next: AppLifecycleState) -> Self {
        match (previous.is_foreground(), next.is_foreground()) {
            (true, false) => Self::EnteredBackground,
            (false, true) => Self::EnteredForeground,
            _ => Self::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppLifecycleState::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            LifecycleTransition::classify(Active, Background),
            LifecycleTransition::EnteredBackground
        );
        assert_eq!(
            LifecycleTransition::classify(Active, Inactive),
            LifecycleTransition::EnteredBackground
        );
        assert_eq!(
            LifecycleTransition::classify(Inactive, Active),
            LifecycleTransition::EnteredForeground
        );
        assert_eq!(
            LifecycleTransition::classify(Inactive, Background),
            LifecycleTransition::Unchanged
        );
        assert_eq!(
            LifecycleTransition::classify(Active, Active),
            LifecycleTransition::Unchanged
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("Background".parse::<AppLifecycleState>().unwrap(), Background);
        assert_eq!(" active ".parse::<AppLifecycleState>().unwrap(), Active);
        assert!("suspended".parse::<AppLifecycleState>().is_err());
        assert_eq!(Inactive.to_string(), "inactive");
    }
}

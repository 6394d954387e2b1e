use stackshot_remote::StackSnapshot;
use stackshot_schema::StackId;
use std::fmt;

/// Whether the target stack exists on the remote side.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StackPresence {
    /// Not yet loaded.
    #[default]
    Unknown,
    /// The service reported the stack does not exist.
    Absent,
    Present(StackSnapshot),
}

impl StackPresence {
    pub fn is_present(&self) -> bool {
        matches!(self, StackPresence::Present(_))
    }

    pub fn snapshot(&self) -> Option<&StackSnapshot> {
        match self {
            StackPresence::Present(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn stack_id(&self) -> Option<&StackId> {
        self.snapshot().map(|s| &s.stack_id)
    }
}

impl fmt::Display for StackPresence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackPresence::Unknown => f.write_str("unknown"),
            StackPresence::Absent => f.write_str("absent"),
            StackPresence::Present(s) => write!(f, "present ({})", s.stack_status),
        }
    }
}

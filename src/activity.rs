/// What a worker is doing right now, as shown on the status board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Starting,
    Requesting,
    Reading,
    Hashing,
    Idle,
    Exited,
}

impl Activity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Starting => "Starting",
            Self::Requesting => "Making request",
            Self::Reading => "Reading response",
            Self::Hashing => "Reading response, making checksum",
            Self::Idle => "Idle",
            Self::Exited => "Exited",
        }
    }

    /// Single character for the status line.
    pub const fn mark(self) -> char {
        match self {
            Self::Starting => 'b',
            Self::Requesting => 's',
            Self::Reading | Self::Hashing => 'r',
            Self::Idle => '.',
            Self::Exited => 'x',
        }
    }
}

/// Mark of a slot no worker has touched yet.
pub const UNUSED_MARK: char = ' ';

use std::path::PathBuf;

pub type PtracResult<T> = Result<T, PtracError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PtracErrorKind {
    StreamCorruption,
    RecordLengthMismatch,
    ProtocolViolation,
    OrphanNeutron,
    Io,
    Config,
}

impl PtracErrorKind {
    pub const fn exit_status(self) -> ExitStatus {
        match self {
            Self::Config => ExitStatus {
                exit_code: 2,
                placeholder: "INPUT.FORMAT_CONFIG",
                class: "INPUT_FATAL",
            },
            Self::Io => ExitStatus {
                exit_code: 3,
                placeholder: "IO.PTRAC_READ",
                class: "IO_FATAL",
            },
            Self::StreamCorruption => ExitStatus {
                exit_code: 4,
                placeholder: "DECODE.STREAM_CORRUPTION",
                class: "RUN_FATAL",
            },
            Self::RecordLengthMismatch => ExitStatus {
                exit_code: 4,
                placeholder: "DECODE.RECORD_LENGTH",
                class: "RUN_FATAL",
            },
            Self::ProtocolViolation => ExitStatus {
                exit_code: 4,
                placeholder: "DECODE.PROTOCOL",
                class: "RUN_FATAL",
            },
            Self::OrphanNeutron => ExitStatus {
                exit_code: 4,
                placeholder: "CHAIN.ORPHAN_NEUTRON",
                class: "NPS_SKIPPED",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_status().exit_code
    }

    pub const fn placeholder(self) -> &'static str {
        self.exit_status().placeholder
    }

    /// Only a failed parent lookup is confined to a single NPS; everything
    /// else leaves the stream in an unknown position.
    pub const fn is_recoverable(self) -> bool {
        matches!(self, Self::OrphanNeutron)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    pub exit_code: i32,
    pub placeholder: &'static str,
    pub class: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum PtracError {
    #[error("stream corruption: requested {requested} bytes but only {available} available")]
    StreamCorruption { requested: usize, available: usize },
    #[error("mismatched record length: leading marker {leading}, trailing marker {trailing}")]
    RecordLengthMismatch { leading: i32, trailing: i32 },
    #[error("history {nps} does not open with a source-class event (event code {event_code})")]
    ProtocolViolation { nps: i64, event_code: i64 },
    #[error(
        "orphan neutron in history {nps}: no node destroyed at t={creation_time:e}, position {creation_position:?}"
    )]
    OrphanNeutron {
        nps: i64,
        creation_time: f64,
        creation_position: [f64; 3],
    },
    #[error("failed to read PTRAC stream: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("unusable format configuration: {message}")]
    Config { message: String },
}

impl PtracError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> PtracErrorKind {
        match self {
            Self::StreamCorruption { .. } => PtracErrorKind::StreamCorruption,
            Self::RecordLengthMismatch { .. } => PtracErrorKind::RecordLengthMismatch,
            Self::ProtocolViolation { .. } => PtracErrorKind::ProtocolViolation,
            Self::OrphanNeutron { .. } => PtracErrorKind::OrphanNeutron,
            Self::Io { .. } => PtracErrorKind::Io,
            Self::Config { .. } => PtracErrorKind::Config,
        }
    }

    pub const fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    pub fn is_recoverable(&self) -> bool {
        self.kind().is_recoverable()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.is_recoverable() {
            "WARNING"
        } else {
            "ERROR"
        };
        format!("{}: [{}] {}", severity, self.kind().placeholder(), self)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        (!self.is_recoverable()).then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FormatConfigError {
    #[error("failed to read format configuration '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse format configuration '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

use std::fmt;

#[derive(Debug)]
pub enum RemixForgeError {
    Graph(GraphError),
    Playback(PlaybackError),
    Provider(ProviderError),
}

/// Errors raised while constructing an effect chain or one of its stages.
///
/// Optional-stage errors (bit-crusher, reverb impulse) are recovered inside
/// the chain builder and never reach callers; only a failure to wire the
/// mandatory path surfaces, and the transport answers it with a bypass chain.
#[derive(Debug)]
pub enum GraphError {
    InvalidSampleRate { sample_rate: f64 },
    InvalidBitDepth { bits: u32 },
    EmptyImpulse,
    StageUnavailable { stage: &'static str },
}

#[derive(Debug)]
pub enum PlaybackError {
    NoBufferLoaded,
    EmptyBuffer,
    SeekOutOfRange { seconds: f64, duration: f64 },
}

#[derive(Debug)]
pub enum ProviderError {
    Unavailable { detail: String },
    BadResponse { detail: String },
    FallbackExhausted { kind: &'static str },
}

impl fmt::Display for RemixForgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemixForgeError::Graph(e) => write!(f, "Graph error: {e}"),
            RemixForgeError::Playback(e) => write!(f, "Playback error: {e}"),
            RemixForgeError::Provider(e) => write!(f, "Provider error: {e}"),
        }
    }
}

impl std::error::Error for RemixForgeError {}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::InvalidSampleRate { sample_rate } => {
                write!(f, "Invalid sample rate {sample_rate}")
            }
            GraphError::InvalidBitDepth { bits } => {
                write!(f, "Bit depth {bits} outside 1..=16")
            }
            GraphError::EmptyImpulse => write!(f, "Impulse response has zero length"),
            GraphError::StageUnavailable { stage } => {
                write!(f, "Effect stage '{stage}' could not be constructed")
            }
        }
    }
}

impl std::error::Error for GraphError {}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::NoBufferLoaded => write!(f, "No audio buffer loaded"),
            PlaybackError::EmptyBuffer => write!(f, "Loaded audio buffer is empty"),
            PlaybackError::SeekOutOfRange { seconds, duration } => {
                write!(f, "Seek to {seconds}s outside buffer duration {duration}s")
            }
        }
    }
}

impl std::error::Error for PlaybackError {}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Unavailable { detail } => write!(f, "Provider unavailable: {detail}"),
            ProviderError::BadResponse { detail } => write!(f, "Bad provider response: {detail}"),
            ProviderError::FallbackExhausted { kind } => {
                write!(f, "No provider result and no usable fallback for {kind}")
            }
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<GraphError> for RemixForgeError {
    fn from(e: GraphError) -> Self {
        RemixForgeError::Graph(e)
    }
}

impl From<PlaybackError> for RemixForgeError {
    fn from(e: PlaybackError) -> Self {
        RemixForgeError::Playback(e)
    }
}

impl From<ProviderError> for RemixForgeError {
    fn from(e: ProviderError) -> Self {
        RemixForgeError::Provider(e)
    }
}

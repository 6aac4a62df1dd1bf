use thiserror::Error;

use crate::otlp::SignalType;

/// Failure at decode entry. Inner field problems never surface here.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid {signal} envelope: {source}")]
    InvalidEnvelope {
        signal: SignalType,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    pub fn invalid_envelope(signal: SignalType, source: serde_json::Error) -> Self {
        Self::InvalidEnvelope { signal, source }
    }

    pub fn signal(&self) -> SignalType {
        match self {
            Self::InvalidEnvelope { signal, .. } => *signal,
        }
    }
}

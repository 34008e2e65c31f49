use std::fmt;

use thiserror::Error;

use crate::proximity::NotFound;
use crate::types::{EntranceId, RequestId, SpotType};

pub type Result<T> = std::result::Result<T, LotError>;

/// Coarse failure classes. Front ends must keep these distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NoSpotAvailable,
    AlreadyAssigned,
    UnknownRequest,
    ConfigurationError,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::NoSpotAvailable => "NoSpotAvailable",
            ErrorKind::AlreadyAssigned => "AlreadyAssigned",
            ErrorKind::UnknownRequest => "UnknownRequest",
            ErrorKind::ConfigurationError => "ConfigurationError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum LotError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no {spot_type} spot available at entrance {entrance}")]
    NoSpotAvailable {
        spot_type: SpotType,
        entrance: EntranceId,
        #[source]
        cause: NotFound,
    },

    #[error("request `{0}` already holds a spot")]
    AlreadyAssigned(RequestId),

    #[error("request `{0}` has no active assignment")]
    UnknownRequest(RequestId),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("malformed configuration")]
    MalformedConfig(#[from] serde_json::Error),
}

impl LotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LotError::InvalidInput(_) => ErrorKind::InvalidInput,
            LotError::NoSpotAvailable { .. } => ErrorKind::NoSpotAvailable,
            LotError::AlreadyAssigned(_) => ErrorKind::AlreadyAssigned,
            LotError::UnknownRequest(_) => ErrorKind::UnknownRequest,
            LotError::Configuration(_) | LotError::MalformedConfig(_) => {
                ErrorKind::ConfigurationError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinates;
    use std::error::Error as _;

    #[test]
    fn no_spot_keeps_index_cause() {
        let err = LotError::NoSpotAvailable {
            spot_type: SpotType::Large,
            entrance: EntranceId::new(2),
            cause: NotFound {
                spot_type: SpotType::Large,
                origin: Coordinates::new(5, 5),
            },
        };
        assert_eq!(err.kind(), ErrorKind::NoSpotAvailable);
        assert_eq!(err.to_string(), "no large spot available at entrance 2");
        let source = err.source().expect("index failure attached");
        assert!(source.to_string().contains("(5, 5)"));
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        let parse = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = LotError::from(parse);
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
        assert_eq!(err.kind().to_string(), "ConfigurationError");
    }
}

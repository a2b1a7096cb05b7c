use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Position ({x}, {y}) is outside the {size}x{size} grid")]
    Boundary { x: i32, y: i32, size: i32 },

    #[error("Unknown region: {id}")]
    UnknownRegion { id: String },

    #[error("Unknown agent: {id}")]
    UnknownAgent { id: u32 },

    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("No active region available")]
    NoAvailableRegion,
}

impl SimError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration { reason: reason.into() }
    }
}

pub type SimResult<T> = Result<T, SimError>;

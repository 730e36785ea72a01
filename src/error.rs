use thiserror::Error;

#[derive(Error, Debug)]
pub enum WindcastError {
    #[error("data format error: {message}")]
    DataFormat { message: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("not implemented: {feature} for {kind}")]
    NotImplemented { feature: String, kind: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WindcastError {
    pub fn data_format(message: impl Into<String>) -> Self {
        WindcastError::DataFormat { message: message.into() }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        WindcastError::InvalidArgument { message: message.into() }
    }

    pub fn not_implemented(feature: impl Into<String>, kind: impl Into<String>) -> Self {
        WindcastError::NotImplemented { feature: feature.into(), kind: kind.into() }
    }
}

pub type WindcastResult<T> = Result<T, WindcastError>;

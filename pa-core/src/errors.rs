pub use anyhow::{
    anyhow,
    bail,
    ensure,
};
pub use thiserror::Error;

pub type EmptyResult = anyhow::Result<()>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration file {0}")]
    FileUnreadable(String),

    #[error("could not parse configuration document: {0}")]
    ParseFailed(#[from] serde_yaml::Error),

    #[error("configmap {0}/{1} not present in the informer cache")]
    ConfigMapMissing(String, String),

    #[error("configmap {0}/{1} has no {2} key")]
    ConfigMapKeyMissing(String, String, String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum KubernetesError {
    #[error("field not found in object: {0}")]
    FieldNotFound(String),

    #[error("informer cache never became ready: {0}")]
    CacheSyncFailed(String),
}

use thiserror::Error;

/// Everything that can go wrong inside the engine
#[derive(Error, Debug)]
pub enum TelekinesisError {
    /// The JSON configuration was malformed
    #[error("Unable to parse the configuration")]
    ConfigError(#[from] serde_json::Error),
    /// A system asked for a component an entity does not have
    #[error("An entity was missing a required component")]
    ComponentError(#[from] hecs::ComponentError),
    /// A system asked for an entity that has been despawned
    #[error("The entity no longer exists")]
    NoSuchEntity(#[from] hecs::NoSuchEntity),
    /// The classifier thread has gone away
    #[error("The gesture worker has shut down")]
    WorkerDisconnected,
    /// Reading a file failed
    #[error(transparent)]
    IO(#[from] std::io::Error),
    /// Anything else
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

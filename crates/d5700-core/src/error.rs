use std::io;

use thiserror::Error;

use crate::rom::RomError;
use crate::state::LifecycleError;

/// Failure of an [`crate::Emulator`] control operation.
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// Program image was refused.
    #[error(transparent)]
    Rom(#[from] RomError),
    /// Operation is not allowed in the current lifecycle state.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// A clock thread could not be started.
    #[error("failed to spawn clock thread")]
    Spawn(#[source] io::Error),
}

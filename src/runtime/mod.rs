pub mod interaction;
pub mod runtime_error;
pub mod vm;

pub use interaction::{ConsoleInteraction, Interaction, InteractionError, RecordingInteraction};
pub use runtime_error::{ErrorKind, RuntimeError};
pub use vm::{Vm, VmConfig};

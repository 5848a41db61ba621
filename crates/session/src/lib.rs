// Playback session: engine state machine, control surface, shortcuts and collaborator helpers

pub mod completion;
pub mod controls;
pub mod engine;
pub mod session;
pub mod shortcuts;
pub mod store;

#[cfg(test)]
mod testing;

pub use completion::{CompletionPolicy, CompletionPrompt};
pub use controls::ControlSurfaceTimer;
pub use engine::PlaybackEngine;
pub use session::{PlaybackSession, SessionInfo};
pub use shortcuts::{Key, ShortcutAction, ShortcutDispatcher};
pub use store::{KeyValueStore, MemoryStore, ReleaseNotesGate};

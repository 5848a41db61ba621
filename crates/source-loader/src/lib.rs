// Turns a source reference into a playable resource, reading local files in ranged chunks

pub mod bridge;
pub mod chunked;
pub mod content_type;
pub mod resource;

pub use bridge::{FileBridge, LocalFileBridge};
pub use chunked::{
    is_remote_locator, CancellationToken, ChunkReadState, ChunkedSourceLoader, LoadMessage,
    LoadTask,
};
pub use content_type::content_type_for_path;
pub use resource::{PlayableResource, ResourceHandle, ResourceRegistry, ResourceSlot};

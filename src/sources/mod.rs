pub mod stremio;
pub mod traits;

pub use stremio::StremioStreamSource;
pub use traits::{MetadataProvider, StreamSource};

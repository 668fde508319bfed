pub mod archive;
pub mod blocks;
pub mod crypto;
pub mod entries;
pub mod error;
pub mod filter;
pub mod header;
pub mod reader;

pub use archive::{Archive, EntryInfo, ExtractOptions, ExtractStats};
pub use error::{Error, Result};
pub use filter::WildcardPattern;
pub use reader::{ContainerKind, ContainerReader};

//! Impls - concrete implementations of the ports.
//!
//! # Included
//! - **SqliteRepository**: durable history on SQLite
//! - **InMemoryRepository**: non-durable history for development and tests
//! - **FsLocalCache**: flat-directory cache with history-ordered eviction
//! - **RemoteProvider** over a `Gallery`, with **SimpleDesktopsGallery**
//! - **LocalDirectoryProvider**: random pick from a directory
//! - **CommandApplier**: gsettings / qdbus, resolved from the environment

pub mod desktop;
pub mod fs_cache;
pub mod inmem_repository;
pub mod local_directory;
pub mod remote;
pub mod simple_desktops;
pub mod sqlite_repository;

pub use self::desktop::{CommandApplier, DesktopTarget, Invocation, resolve_applier};
pub use self::fs_cache::FsLocalCache;
pub use self::inmem_repository::InMemoryRepository;
pub use self::local_directory::LocalDirectoryProvider;
pub use self::remote::{
    Download, FetchError, Gallery, GalleryEntry, RemoteOptions, RemoteProvider,
};
pub use self::simple_desktops::SimpleDesktopsGallery;
pub use self::sqlite_repository::SqliteRepository;

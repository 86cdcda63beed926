//! The `.ebp` container: header layout, header I/O and table growth.

pub mod compactor;
pub mod header;
pub mod layout;

pub use compactor::{backup_path, grow, grow_stream, plan_relocations, renumber_ids, GrowReport, WorkerLocation};
pub use header::{HeaderIo, WorkerCounts};
pub use layout::ContainerLayout;

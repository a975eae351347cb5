// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bildwerk-pipeline — Batch orchestration for the Bildwerk engine.
//
// Hosts the two operations the routing layer invokes (batch conversion and
// merge), the upload/output file stores, the incremental batch archive,
// injected output naming, and the retention sweep collaborator.

pub mod archive;
pub mod batch;
pub mod naming;
pub mod retention;
pub mod store;

// Re-export the primary structs so callers can use
// `bildwerk_pipeline::BatchPipeline` etc.
pub use archive::BatchArchive;
pub use batch::BatchPipeline;
pub use naming::{NameGenerator, UuidNames};
pub use retention::RetentionSweeper;
pub use store::{OutputStore, UploadStore};

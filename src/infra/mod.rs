// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-system concerns shared by training and sampling:
//
//   checkpoint.rs — Component weights (burn recorder), the
//                   latest-iteration marker and TrainConfig JSON,
//                   so `sample` can rebuild the exact model.
//
//   metrics.rs    — Learning-curve CSV (`step,avg_loss`).
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Component checkpoint saving and loading
pub mod checkpoint;

/// Loss curve CSV logger
pub mod metrics;

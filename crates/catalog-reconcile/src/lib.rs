//! # catalog-reconcile
//!
//! Set reconciliation for many-to-many association tables.
//!
//! Given an owner, a desired list of related identifiers and the join rows
//! currently stored for the owner, the [`Reconciler`] computes the smallest
//! remove batch and add batch that make the stored set match the desired one,
//! then runs both batches concurrently against an
//! [`AssociationStore`](catalog_storage::AssociationStore).
//!
//! ## Example
//!
//! ```ignore
//! use catalog_reconcile::{DesiredSet, Reconciler};
//!
//! let reconciler = Reconciler::new(storage.product_tags());
//! let outcome = reconciler
//!     .reconcile(product_id, &DesiredSet::from(vec![2, 3]))
//!     .await?;
//! tracing::info!(removed = outcome.removed, added = outcome.inserted.len(), "tags updated");
//! ```
//!
//! ## Failure model
//!
//! The two batches are independent store calls. If one succeeds and the other
//! fails the error is [`ReconcileError::PartialApplication`] and names the
//! failed side; nothing is rolled back and nothing is retried.

mod desired;
mod error;
mod plan;
mod reconciler;

pub use desired::DesiredSet;
pub use error::{ReconcileError, StoreOperation};
pub use plan::ReconcilePlan;
pub use reconciler::{ReconcileOutcome, Reconciler, ReconcilerConfig};

/// Type alias for a reconciliation result.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

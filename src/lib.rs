//! Core library for the aideon-ledger command line application.
//!
//! The library turns two loosely structured spreadsheet exports, a revenue
//! and hours workbook and a costs workbook, into a normalized fact table
//! keyed by reporting period and branch, then aggregates it and derives
//! findings. IO adapters live under [`aideon::ledger::io`], the fact model
//! inside [`aideon::ledger::model`], table extraction in
//! [`aideon::ledger::extract`] and [`aideon::ledger::costs`], the join in
//! [`aideon::ledger::reconcile`], analysis under [`aideon::ledger::aggregate`],
//! [`aideon::ledger::insight`] and [`aideon::ledger::report`], and the
//! memoized orchestration in [`aideon::ledger::pipeline`].

pub mod aideon;

pub use aideon::ledger::{
    LedgerError, Result, aggregate, cache, config, costs, error, extract, insight, io, model,
    pipeline, reconcile, report,
};

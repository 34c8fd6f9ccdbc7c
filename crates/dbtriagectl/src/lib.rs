//! dbtriagectl - disaster-scenario triage for clustered MariaDB on Kubernetes
//!
//! Probes the control plane and the database, folds the results into one
//! `DiagnosticState`, and ranks the matching scenarios.

pub mod aggregator;
pub mod cli;
pub mod client;
pub mod credentials;
pub mod logging;
pub mod probes;
pub mod runner;

pub use aggregator::Aggregator;
pub use client::{ClusterClient, FakeClusterClient, KubectlClient, ProbeError};
pub use runner::{diagnose, render};

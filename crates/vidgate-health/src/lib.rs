//! Screen classification and health aggregation for rack cameras.
//!
//! [`FrameClassifier`] turns a decoded frame into a [`ScreenVerdict`];
//! [`ScreenInspector`] adds the second-sample frozen-frame check on top of a
//! [`FrameSource`]; [`HealthAggregator`] merges device probes with the
//! externally reported lease status into one [`HealthStatusBean`].

#![deny(missing_docs)]

pub mod aggregator;
pub mod classifier;
pub mod client;
pub mod frame;
pub mod models;
pub mod screen;
pub mod source;

pub use aggregator::HealthAggregator;
pub use classifier::{Assessment, FrameClassifier};
pub use client::{RackClient, RackClientBuilder};
pub use frame::Frame;
pub use models::{HealthStatusBean, LeaseDocument, LeaseStatus, ScreenVerdict};
pub use screen::ScreenInspector;
pub use source::{FrameSource, LeaseSource};

/// Convenient result alias matching the shared gateway error type.
pub type Result<T> = vidgate_core::Result<T>;

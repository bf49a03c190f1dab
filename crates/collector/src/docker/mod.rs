//! Bollard-backed Docker transport.

pub mod client;
pub mod container;
pub mod inventory;

pub use client::{DockerClient, DockerError};
pub use inventory::SourceInfo;

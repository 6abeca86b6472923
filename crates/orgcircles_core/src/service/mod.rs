//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate model commands, persistence, layout and focus into one
//!   command surface for UI adapters.
//! - Keep adapters decoupled from storage and geometry details.

pub mod workspace_service;

pub use workspace_service::{Committed, Frame, FrameNode, WorkspaceService};

//! Wai: Well-Architected interview report and task synchronisation engine.
//!
//! This crate drives a structured interview against the AWS Well-Architected
//! question catalogue. It keeps one durable report file per pillar, records
//! each question's status, answer, and gathered evidence, and reconciles
//! every question with a linked task in the Kanbus tracker.
//!
//! # Architecture
//!
//! Wai follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (filesystem, Kanbus, etc.)
//!
//! # Modules
//!
//! - [`report`]: Pillar report model, status state machine, and the strict
//!   text codec with its round-trip guarantee
//! - [`assessment`]: Assessment-wide state, evidence merge, task sync, and
//!   the orchestrator behind the CLI commands
//! - [`config`]: Explicit configuration object passed into the orchestrator

pub mod assessment;
pub mod config;
pub mod report;

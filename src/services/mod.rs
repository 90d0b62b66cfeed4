/// Admin controller: phase transitions, scoring and reset.
pub mod admin_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Shared quiz plumbing: bootstrap, phase projection and participant writes.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Registration, session resume and prediction submission.
pub mod participant_service;
/// Public service for read-only quiz information.
pub mod public_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events subscription and streaming.
pub mod sse_service;
/// Storage connection supervisor and degraded-mode watcher.
pub mod storage_supervisor;

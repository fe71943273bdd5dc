//! Domain services used by the HTTP and websocket routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on request translation and auth plumbing.
//! Pure view logic (filtering, sorting, pivots, KPIs) lives in `crate::crm`.

pub mod analysis;
pub mod applications;
pub mod auth;
pub mod dashboard;
pub mod forms;
pub mod leads;
pub mod messages;
pub mod notes;
pub mod notify;
pub mod realtime;
pub mod session;
pub mod social;

//! Request handlers.
//!
//! Each submodule serves one area of the front end. Handlers delegate to the
//! Notion gateway, the image relay or the job tracker held in [`AppState`]
//! and map errors via [`AppError`].
//!
//! [`AppState`]: crate::state::AppState
//! [`AppError`]: crate::error::AppError

pub mod calendar;
pub mod generation;
pub mod image_proxy;
pub mod media;
pub mod prompts;

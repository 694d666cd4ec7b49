//! Onboarding/update flow: payload dispatch, state machine, keyboards.

pub mod dispatch;
pub mod engine;
pub mod keyboards;

pub use dispatch::{CallbackAction, Command};
pub use engine::Engine;

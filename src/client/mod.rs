//! Client side of signup: the form, its debounced submission, and the HTTP call behind it.
//!
//! [`SignupFlow`] owns the form state and reacts to [`FormEvent`]s. Rendering, notifications
//! and navigation go through [`SignupView`]; the network goes through [`SignupApi`], with
//! [`HttpSignupApi`] as the `reqwest` implementation.

mod api;
mod debounce;
mod flow;

pub use api::*;
pub use debounce::*;
pub use flow::*;

//! Application layer orchestrating the payment flow.
//!
//! `PaymentSession` is the controller the UI talks to and the SDK calls back
//! into. It classifies SDK callbacks and, when a brick payment needs a server
//! charge, hands the work to `ChargeConfirmer` on a background `tokio` task.

pub mod confirmation;
pub mod session;

//! Data Transfer Objects
//!
//! Wire shapes the controller receives from the outside world.

pub mod notification;

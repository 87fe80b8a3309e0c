pub mod general;

pub use general::{bot_info, panel};

//! Bots for Boardforge.
//!
//! A bot is anything implementing [`Bot`]: given a state and the player it
//! controls, it proposes one action (or none). How it searches is its own
//! business; sessions only rely on this calling contract.
//!
//! [`RandomBot`] is the reference implementation. It plays uniformly at
//! random among the options the game's `ai` enumerator offers.

mod bot;
mod error;
mod random;

pub use bot::{Bot, BotContext, BotFuture};
pub use error::BotError;
pub use random::RandomBot;

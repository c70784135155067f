pub mod health;
pub mod operator;
pub mod public;

mod cli;
mod printer;

pub use cli::{Cli, Command, IndexOverrides};
pub use printer::{NotificationPrinter, TreePrinter};

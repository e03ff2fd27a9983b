//! Sample catalog and commands behind the `provkit` binary.

pub mod commands;
pub mod sample;

use clap::ValueEnum;
use provkit_registry::Kind;

/// Command-line spelling of [`Kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Resource,
    DataSource,
}

impl From<KindArg> for Kind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Resource => Kind::Resource,
            KindArg::DataSource => Kind::DataSource,
        }
    }
}

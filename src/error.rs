//! Command line Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("invalid argument: {_0}")]
    Argument(#[error(not(source))] String),
    #[display("could not open the cache")]
    Cache,
    #[display("could not set up the remote site")]
    Remote,
    /// A resolution ended in an error; it has already been reported.
    #[display("resolution failed")]
    Resolution,
}

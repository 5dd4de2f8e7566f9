pub mod env;
pub mod oracle;

pub use env::{EnvBuilderTrait, MutationEnvBuilder, PositionEnvBuilder};
pub use oracle::OracleBuilder;

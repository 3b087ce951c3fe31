use std::path::PathBuf;

use snafu::Snafu;

#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
pub enum SrsError {
    #[snafu(display("invalid configuration: {reason}"))]
    InvalidConfig { reason: String },
    #[snafu(display("unknown rating `{value}`, expected easy, medium or hard"))]
    UnknownRating { value: String },
    #[snafu(display("malformed vocabulary catalog: {source}"))]
    MalformedCatalog { source: serde_json::Error },
    #[snafu(display("storage i/o failed at {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T, E = SrsError> = std::result::Result<T, E>;

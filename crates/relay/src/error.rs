pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("trigger marker must not be empty")]
    EmptyMarker,
}

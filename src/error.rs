/// Pipeline streaming error
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("buffers are allocated, the configuration is frozen")]
    Busy,
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    #[error("no DMA endpoint found in the pipeline")]
    NotFound,
    #[error("endpoint is not connected to a processing stage")]
    NotConnected,
    #[error("link validation failed: {0}")]
    LinkMismatch(&'static str),
    #[error("endpoint format does not match the connected stage: {0}")]
    FormatMismatch(&'static str),
    #[error("DMA channel rejected the transfer")]
    ChannelRejected,
    #[error("stage {stage} failed: {reason}")]
    Stage { stage: String, reason: String },
}

impl Error {
    /// Returns a stage failure for the stage named `stage`
    ///
    /// # Example
    ///
    /// ```
    /// use vipp::Error;
    /// let err = Error::stage("csi2rx", "PHY not ready");
    /// assert_eq!(err.to_string(), "stage csi2rx failed: PHY not ready");
    /// ```
    pub fn stage<S: Into<String>, R: Into<String>>(stage: S, reason: R) -> Self {
        Error::Stage {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

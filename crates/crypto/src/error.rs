use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid signature encoding")]
    InvalidSignatureEncoding,
    #[error("invalid public key encoding")]
    InvalidPublicKeyEncoding,
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("aggregation failed: {0}")]
    AggregationFailed(String),
    #[error("invalid proof encoding")]
    InvalidProofEncoding,
}

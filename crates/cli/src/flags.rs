use clap::ValueEnum;
use tramites_vector_store::EmbeddingMode;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum EmbedMode {
    Fast,
    Stub,
}

impl EmbedMode {
    pub(crate) const fn as_domain(self) -> EmbeddingMode {
        match self {
            EmbedMode::Fast => EmbeddingMode::Fast,
            EmbedMode::Stub => EmbeddingMode::Stub,
        }
    }
}

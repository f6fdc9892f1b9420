pub(crate) mod embeddings;
pub(crate) mod encoder;
pub(crate) mod layers;
pub(crate) mod masked_lm;

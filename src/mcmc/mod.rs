mod engine;
mod sampler;

pub use engine::{CredibleInterval, McmcRun, run_mcmc};
pub use sampler::{EnsembleSampler, LogProb};

mod spectral;

pub use spectral::{
    FluxSpace, curve_log_e2dnde, evaluate, evaluate_log_e2dnde, initial_guess, ln_likelihood,
    ln_posterior, ln_prior, native_space, param_labels, posterior_column_names, summary_labels,
};

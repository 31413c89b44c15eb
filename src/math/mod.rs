mod logspace;
mod quantile;

pub use logspace::{linear_to_log, log_error_from_linear, log_space};
pub use quantile::quantile;

pub mod corrector;
pub mod interpolation;
pub mod nn_cache;
pub mod sample;
pub mod scaler;
pub mod smoother;
pub mod store;

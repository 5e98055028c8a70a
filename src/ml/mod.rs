pub mod baseline;
pub mod features;
pub mod forecast;
pub mod predictor;

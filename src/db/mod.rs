pub mod countries;

pub use countries::{CountryDataset, CountryRepo};

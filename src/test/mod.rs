//! Statistical hypothesis testing on expression rows.

pub mod two_sample;

pub use two_sample::{welch_t_test, TwoSampleTest, WelchResult};

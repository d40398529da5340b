//! Helpers for standing up throwaway databases and fixture data in integration tests.
pub mod prepare_env;
pub mod seeds;

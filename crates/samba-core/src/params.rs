//! Process-wide PRE public parameters

use crate::pre::{PreScheme, PublicParams, PublicParamsSerialized};

/// Holds the scheme's public parameters for the lifetime of the process
///
/// Initialized once at startup and never mutated; the serialized form is
/// computed up front so serving it cannot fail per request.
#[derive(Debug, Clone)]
pub struct PublicParamsProvider {
    params: PublicParams,
    serialized: PublicParamsSerialized,
}

impl PublicParamsProvider {
    pub fn new(params: PublicParams) -> Self {
        let serialized = params.serialize();
        Self { params, serialized }
    }

    /// Fresh parameters from the scheme
    pub fn generate(scheme: &dyn PreScheme) -> Self {
        Self::new(scheme.setup())
    }

    /// Fixed parameters (e.g. from config), checked against the scheme
    pub fn from_bytes(scheme: &dyn PreScheme, bytes: Vec<u8>) -> crate::Result<Self> {
        let params = PublicParams::new(bytes);
        scheme.check_params(&params)?;
        Ok(Self::new(params))
    }

    pub fn get_params(&self) -> &PublicParams {
        &self.params
    }

    pub fn serialized(&self) -> &PublicParamsSerialized {
        &self.serialized
    }
}

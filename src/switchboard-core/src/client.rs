//! Remote configuration source.

use serde_json::Value;

use crate::entity::Values;
use crate::error::ClientError;

/// Fetches the configuration JSON for a person.
///
/// Transport is up to the implementor: HTTP, a bundled file, a fixture.
pub trait ConfigurationClient {
    /// Download the configuration for `uuid`. `user_data` is merged into the
    /// request, typically [`crate::default_properties`] plus app-specific keys.
    fn download_configuration(
        &self,
        uuid: &str,
        user_data: Option<&Values>,
    ) -> Result<Value, ClientError>;
}

impl<F> ConfigurationClient for F
where
    F: Fn(&str, Option<&Values>) -> Result<Value, ClientError>,
{
    fn download_configuration(
        &self,
        uuid: &str,
        user_data: Option<&Values>,
    ) -> Result<Value, ClientError> {
        self(uuid, user_data)
    }
}

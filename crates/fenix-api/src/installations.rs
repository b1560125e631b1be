// Installation (inventory) endpoints

use secrecy::SecretString;

use crate::client::FenixClient;
use crate::error::Error;
use crate::models::{Installation, Sensor};

impl FenixClient {
    /// List every home the account administers.
    ///
    /// `GET /businessmodule/v1/installations/admins/{subject_id}`
    pub async fn list_installations(
        &self,
        token: &SecretString,
        subject_id: &str,
    ) -> Result<Vec<Installation>, Error> {
        let url = self.api_url(&format!(
            "businessmodule/v1/installations/admins/{subject_id}"
        ))?;
        self.get(url, token).await
    }

    /// Flatten the home → room → sensor tree into a sensor list,
    /// preserving listing order.
    pub async fn list_sensors(
        &self,
        token: &SecretString,
        subject_id: &str,
    ) -> Result<Vec<Sensor>, Error> {
        let homes = self.list_installations(token, subject_id).await?;
        Ok(homes
            .into_iter()
            .flat_map(|home| home.rooms)
            .flat_map(|room| room.sensors)
            .collect())
    }
}

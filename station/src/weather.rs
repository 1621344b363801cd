use station_common::{
    config::WeatherConfig,
    weather::{decode_conditions, request_url},
    Conditions, WeatherError,
};
use tokio::sync::oneshot;
use tracing::debug;

use crate::http::HttpClient;

#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: HttpClient,
    url: String,
}

impl WeatherClient {
    pub fn new(http: HttpClient, config: &WeatherConfig) -> Self {
        Self::with_url(http, request_url(config))
    }

    pub fn with_url(http: HttpClient, url: String) -> Self {
        Self { http, url }
    }

    pub fn refresh(
        &self,
    ) -> Result<oneshot::Receiver<Result<Conditions, WeatherError>>, WeatherError> {
        let response = self
            .http
            .get(&self.url)
            .map_err(|err| WeatherError::Request(err.to_string()))?;

        let (done, rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = match response.await {
                Ok(Ok(response)) if response.status_code == 200 => {
                    debug!(bytes = response.body.len(), "decoding weather report");
                    decode_conditions(&response.body)
                }
                Ok(Ok(response)) => Err(WeatherError::Status(response.status_code)),
                Ok(Err(err)) => Err(WeatherError::Request(err.to_string())),
                Err(_) => Err(WeatherError::Request("request was dropped".to_string())),
            };
            let _ = done.send(result);
        });

        Ok(rx)
    }
}

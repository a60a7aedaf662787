use std::io;
use std::time::Duration;

use anyhow::{bail, Result};
use embedded_svc::http::client::{Client, Response};
use embedded_svc::http::Method;
use embedded_svc::io::Read as _;
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use log::info;

use crate::connectivity::Session;

/// HTTPS client bound to one connection, with a per-request timeout.
pub struct EspSession {
    client: Client<EspHttpConnection>,
}

impl EspSession {
    pub fn new(timeout: Duration) -> Result<Self> {
        let config = Configuration {
            timeout: Some(timeout),
            use_global_ca_store: true,
            crt_bundle_attach: Some(esp_idf_sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let connection = EspHttpConnection::new(&config)?;
        Ok(Self {
            client: Client::wrap(connection),
        })
    }
}

impl Session for EspSession {
    fn get(&mut self, url: &str) -> Result<Box<dyn io::Read + '_>> {
        let headers = [("accept", "application/json")];
        let response = self.client.request(Method::Get, url, &headers)?.submit()?;

        let status = response.status();
        info!("HTTP GET {} -> status {}", url.chars().take(80).collect::<String>(), status);

        if status == 429 {
            bail!("API rate limited (HTTP 429)");
        }
        if status != 200 {
            bail!("HTTP error: status {}", status);
        }

        Ok(Box::new(Body { response }))
    }
}

/// Streams the response body through `std::io::Read`.
struct Body<'a> {
    response: Response<&'a mut EspHttpConnection>,
}

impl io::Read for Body<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.response
            .read(buf)
            .map_err(|e| io::Error::other(format!("{e:?}")))
    }
}

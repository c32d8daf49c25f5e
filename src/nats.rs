// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS client used by the provisioning transport

use async_nats::{Client, ConnectOptions, Subscriber};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{StackError, StackResult};

/// Configuration for NATS connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatsConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Client name
    pub name: String,
    pub connect_timeout: Duration,
    /// Upper bound on a provisioning request round trip
    pub request_timeout: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "cache-stack".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl NatsConfig {
    /// Defaults with servers taken from a comma-separated `NATS_URL`
    pub fn from_env() -> Self {
        Self::from_url(std::env::var("NATS_URL").ok().as_deref())
    }

    fn from_url(url: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(url) = url {
            let servers: Vec<String> = url
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !servers.is_empty() {
                config.servers = servers;
            }
        }
        config
    }
}

/// NATS client wrapper with JSON payloads
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    pub async fn new(config: NatsConfig) -> StackResult<Self> {
        let connect_options = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(config.connect_timeout)
            .request_timeout(Some(config.request_timeout));

        let client = async_nats::connect_with_options(config.servers.join(","), connect_options)
            .await
            .map_err(|e| StackError::Nats(format!("connect: {}", e)))?;

        info!("Connected to NATS at {:?}", config.servers);

        Ok(Self { client })
    }

    /// Publish a message to a subject
    pub async fn publish<T>(&self, subject: &str, message: &T) -> StackResult<()>
    where
        T: Serialize,
    {
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| StackError::Nats(format!("publish to {}: {}", subject, e)))?;

        debug!("Published message to subject: {}", subject);
        Ok(())
    }

    pub async fn subscribe(&self, subject: &str) -> StackResult<Subscriber> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| StackError::Nats(format!("subscribe to {}: {}", subject, e)))?;

        info!("Subscribed to subject: {}", subject);
        Ok(subscriber)
    }

    /// Request-reply pattern
    pub async fn request<T, R>(&self, subject: &str, request: &T) -> StackResult<R>
    where
        T: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let payload = serde_json::to_vec(request)?;

        let response = self
            .client
            .request(subject.to_string(), payload.into())
            .await
            .map_err(|e| StackError::Nats(format!("request on {}: {}", subject, e)))?;

        let result: R = serde_json::from_slice(&response.payload)
            .map_err(|e| StackError::Deserialization(e.to_string()))?;

        Ok(result)
    }
}

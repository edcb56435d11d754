use std::{path::Path, time::Duration};

use alloy_primitives::Address;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{
    common::Genesis,
    engine::{EngineApi, JwtSecret, DEFAULT_AUTH_PORT},
    providers::AlloyChainClient,
};

/// Prefix of the environment variables that override the config file
pub const ENV_PREFIX: &str = "OPNODE_";

/// Node configuration.
///
/// Layered from the defaults, an optional TOML file and `OPNODE_` environment
/// variables, in that order. Nested keys are separated by `__`, e.g.
/// `OPNODE_ROLLUP__FEE_RECIPIENT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// L1 RPC endpoint
    pub l1_rpc_url: String,
    /// L2 RPC endpoint
    pub l2_rpc_url: String,
    /// Authenticated engine API endpoint of the L2 execution client
    pub l2_engine_url: String,
    /// Hex encoded JWT secret shared with the execution client
    pub jwt_secret: Option<String>,
    /// How often the L1 head is polled for new-head subscriptions
    pub head_poll_interval_ms: u64,
    pub rollup: RollupConfig,
}

/// Rollup parameters fixed at genesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupConfig {
    pub genesis: Genesis,
    /// Suggested fee recipient of derived blocks
    pub fee_recipient: Address,
    /// L1 contract emitting deposit events
    pub deposit_contract: Address,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            l1_rpc_url: "http://127.0.0.1:8545".to_string(),
            l2_rpc_url: "http://127.0.0.1:9545".to_string(),
            l2_engine_url: format!("http://127.0.0.1:{DEFAULT_AUTH_PORT}"),
            jwt_secret: None,
            head_poll_interval_ms: 4_000,
            rollup: RollupConfig::default(),
        }
    }
}

impl Config {
    /// Loads the config, reading `config_path` if given.
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid config")
    }

    pub fn head_poll_interval(&self) -> Duration {
        Duration::from_millis(self.head_poll_interval_ms)
    }

    pub fn jwt_secret(&self) -> Result<Option<JwtSecret>> {
        self.jwt_secret
            .as_deref()
            .map(JwtSecret::from_hex)
            .transpose()
    }

    /// The engine client, authenticated when a JWT secret is configured.
    pub fn engine_api(&self) -> Result<EngineApi> {
        Ok(EngineApi::new(&self.l2_engine_url, self.jwt_secret()?))
    }

    /// The L1 client. A `ws` URL subscribes to new heads, an `http` URL polls.
    pub async fn l1_client(&self) -> Result<AlloyChainClient> {
        let url = self.l1_rpc_url.parse().context("invalid l1 rpc url")?;
        AlloyChainClient::connect(url, self.head_poll_interval())
            .await
            .context("failed to connect to l1 rpc")
    }

    pub async fn l2_client(&self) -> Result<AlloyChainClient> {
        let url = self.l2_rpc_url.parse().context("invalid l2 rpc url")?;
        AlloyChainClient::connect(url, self.head_poll_interval())
            .await
            .context("failed to connect to l2 rpc")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    use crate::common::BlockId;

    const SECRET: &str = "f79ae5046bc11c9927afe911db7143c51a806c4a537cc08e0d37140b0192f430";

    #[test]
    fn defaults_without_file() {
        figment::Jail::expect_with(|_| {
            let config = Config::new(None).expect("defaults");
            assert_eq!(config, Config::default());
            assert_eq!(config.l2_engine_url, "http://127.0.0.1:8551");
            assert!(config.jwt_secret().unwrap().is_none());
            Ok(())
        });
    }

    #[test]
    fn file_then_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "opnode.toml",
                r#"
                l1_rpc_url = "http://l1.local:8545"
                head_poll_interval_ms = 1000

                [rollup]
                fee_recipient = "0x4200000000000000000000000000000000000011"
                deposit_contract = "0x5b47e1a08ea6d985d6649300584e6722ec4b1383"

                [rollup.genesis]
                l2_time = 1700000000

                [rollup.genesis.l1]
                hash = "0x1111111111111111111111111111111111111111111111111111111111111111"
                number = 10
                "#,
            )?;
            jail.set_env("OPNODE_HEAD_POLL_INTERVAL_MS", "250");
            jail.set_env("OPNODE_ROLLUP__GENESIS__L2_TIME", "1700000012");
            jail.set_env("OPNODE_JWT_SECRET", SECRET);

            let config = Config::new(Some(Path::new("opnode.toml"))).expect("config");
            assert_eq!(config.l1_rpc_url, "http://l1.local:8545");
            assert_eq!(config.l2_rpc_url, "http://127.0.0.1:9545");
            assert_eq!(config.head_poll_interval(), Duration::from_millis(250));
            assert_eq!(
                config.rollup.genesis.l1,
                BlockId::new(B256::repeat_byte(0x11), 10)
            );
            assert_eq!(config.rollup.genesis.l2_time, 1_700_000_012);
            assert_eq!(
                config.rollup.fee_recipient,
                "0x4200000000000000000000000000000000000011"
                    .parse::<Address>()
                    .unwrap()
            );
            assert!(config.jwt_secret().unwrap().is_some());
            assert!(config.engine_api().is_ok());
            Ok(())
        });
    }

    #[test]
    fn bad_jwt_secret_is_an_error() {
        let config = Config {
            jwt_secret: Some("0x1234".to_string()),
            ..Default::default()
        };
        assert!(config.jwt_secret().is_err());
        assert!(config.engine_api().is_err());
    }

    #[tokio::test]
    async fn client_transport_follows_url_scheme() {
        let config = Config::default();
        assert!(!config.l1_client().await.unwrap().is_pubsub());
        assert!(!config.l2_client().await.unwrap().is_pubsub());

        let config = Config {
            l1_rpc_url: "ftp://127.0.0.1:8545".to_string(),
            ..Default::default()
        };
        assert!(config.l1_client().await.is_err());
    }
}

//! TSIG key handling

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hickory_client::rr::Name;
use hickory_client::rr::rdata::tsig::TsigAlgorithm as HickoryAlgorithm;
use hickory_proto::rr::dnssec::tsig::TSigner;
use ipamdns_core::{Error, Result, TsigAlgorithm, TsigKeyConfig};
use std::str::FromStr;

/// Allowed clock skew between us and the server, in seconds
const TSIG_FUDGE_TIME_SECS: u16 = 300;

/// Decoded TSIG key, ready to sign
///
/// Signers are built per connection from this, so the decoded secret is the
/// only thing kept around.
#[derive(Clone)]
pub struct TsigKey {
    name: Name,
    algorithm: TsigAlgorithm,
    /// ⚠️ NEVER log this value
    secret: Vec<u8>,
}

impl TsigKey {
    /// Decode and check a configured key
    ///
    /// Fails if the name is not a valid DNS name, the secret is not base64,
    /// or hickory refuses the key.
    pub fn from_config(config: &TsigKeyConfig) -> Result<Self> {
        config.validate()?;

        let name = Name::from_str(&config.name)
            .map_err(|e| Error::config(format!("invalid TSIG key name '{}': {}", config.name, e)))?;
        let secret = BASE64.decode(config.secret.trim()).map_err(|e| {
            Error::config(format!("TSIG key {} secret is not valid base64: {}", config.name, e))
        })?;

        let key = Self {
            name,
            algorithm: config.algorithm,
            secret,
        };
        key.signer()?;
        Ok(key)
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn algorithm(&self) -> TsigAlgorithm {
        self.algorithm
    }

    /// Create a TSIG signer for one connection
    pub fn signer(&self) -> Result<TSigner> {
        TSigner::new(
            self.secret.clone(),
            hickory_algorithm(self.algorithm),
            self.name.clone(),
            TSIG_FUDGE_TIME_SECS,
        )
        .map_err(|e| Error::config(format!("cannot create TSIG signer for {}: {}", self.name, e)))
    }
}

// Custom Debug implementation that hides the secret
impl std::fmt::Debug for TsigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsigKey")
            .field("name", &self.name.to_string())
            .field("algorithm", &self.algorithm)
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

fn hickory_algorithm(algorithm: TsigAlgorithm) -> HickoryAlgorithm {
    match algorithm {
        TsigAlgorithm::HmacMd5 => HickoryAlgorithm::HmacMd5,
        TsigAlgorithm::HmacSha1 => HickoryAlgorithm::HmacSha1,
        TsigAlgorithm::HmacSha224 => HickoryAlgorithm::HmacSha224,
        TsigAlgorithm::HmacSha256 => HickoryAlgorithm::HmacSha256,
        TsigAlgorithm::HmacSha384 => HickoryAlgorithm::HmacSha384,
        TsigAlgorithm::HmacSha512 => HickoryAlgorithm::HmacSha512,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(algorithm: TsigAlgorithm, secret: &str) -> TsigKeyConfig {
        TsigKeyConfig {
            name: "ipam-key".to_string(),
            algorithm,
            secret: secret.to_string(),
        }
    }

    #[test]
    fn supported_algorithms_build_signers() {
        // 32 random-looking bytes
        let secret = BASE64.encode([7u8; 32]);
        for algorithm in [
            TsigAlgorithm::HmacSha256,
            TsigAlgorithm::HmacSha384,
            TsigAlgorithm::HmacSha512,
        ] {
            let key = TsigKey::from_config(&config(algorithm, &secret)).unwrap();
            assert_eq!(key.algorithm(), algorithm);
            assert_eq!(key.name().to_string().trim_end_matches('.'), "ipam-key");
        }
    }

    #[test]
    fn invalid_base64_is_a_configuration_error() {
        let err = TsigKey::from_config(&config(TsigAlgorithm::HmacSha256, "not base64!"))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("base64"));
        assert!(!err.to_string().contains("not base64!"));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(TsigKey::from_config(&config(TsigAlgorithm::HmacSha256, "  ")).is_err());
    }

    #[test]
    fn secret_not_exposed_in_debug() {
        let secret = BASE64.encode(b"super-secret-material");
        let key = TsigKey::from_config(&config(TsigAlgorithm::HmacSha256, &secret)).unwrap();

        let debug_str = format!("{:?}", key);
        assert!(!debug_str.contains(&secret));
        assert!(debug_str.contains("<REDACTED>"));
    }
}

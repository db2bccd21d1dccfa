/*!
Test harness for check routines and the session layer

Wires a `SessionClient` to the mock transport and an in-memory session
store, with:
- device routes from fixtures
- one-call check runs
- assertions on the requests the device received
*/

use crate::transport_stub::{MockReply, MockTransport};
use anyhow::Result;
use serde_json::Value;
use thecus_core::endpoints;
use thecus_core::session::CookieJar;
use thecus_core::{
    run_check, AggregateResult, CheckSettings, CheckType, Credentials, EndpointFallbackResolver,
    MemorySessionStore, SessionClient,
};

pub const TEST_HOST: &str = "nas.local";
pub const TEST_USER: &str = "admin";
pub const TEST_PASSWORD: &str = "s3cret&more";

pub type MockClient = SessionClient<MockTransport>;

pub struct TestHarness {
    pub transport: MockTransport,
    pub store: MemorySessionStore,
    pub credentials: Credentials,
}

impl TestHarness {
    pub fn new() -> Self {
        env_logger::try_init().ok();

        Self {
            transport: MockTransport::new(),
            store: MemorySessionStore::new(),
            credentials: Credentials::new(TEST_HOST, TEST_USER, TEST_PASSWORD),
        }
    }

    /// Starts from a stored session, as left behind by an earlier run
    pub fn with_session(self, cookie: &str) -> Self {
        let mut jar = CookieJar::new();
        jar.absorb(cookie);
        let store = MemorySessionStore::with_data(jar.to_bytes());
        Self { store, ..self }
    }

    /// Fresh client sharing this harness' transport and store
    pub fn client(&self) -> MockClient {
        SessionClient::new(
            self.transport.clone(),
            self.credentials.clone(),
            Box::new(self.store.clone()),
        )
    }

    pub fn resolver(&self) -> EndpointFallbackResolver<MockClient> {
        EndpointFallbackResolver::new(self.client())
    }

    /// Serves `value` on `path` for every request
    pub fn device(&self, path: &str, value: Value) -> &Self {
        self.transport.route_json(path, value);
        self
    }

    /// Accepts logins and hands out `PHPSESSID=fresh`
    pub fn accept_login(&self) -> &Self {
        self.transport.route(
            endpoints::LOGIN_PATH,
            MockReply::json(crate::fixtures::DeviceFixtures::login_ok())
                .with_cookie("PHPSESSID=fresh; path=/"),
        );
        self
    }

    /// A device where every health endpoint answers on its first candidate
    pub fn healthy_device(&self) -> &Self {
        use crate::fixtures::DeviceFixtures as F;

        self.device(first(&endpoints::system_status()), F::system_healthy())
            .device(first(&endpoints::raid_access_status()), F::raid_access("Healthy"))
            .device(
                first(&endpoints::raid_list()),
                F::raid_list(&[("RAID", "Healthy", "120.5 GB / 1862.6 GB")]),
            )
            .device(first(&endpoints::disk_list()), F::disks(&[("1", "a", "OK")]))
            .device(
                first(&endpoints::smart_info("a", "1")),
                F::smart_healthy("WDC WD40EFRX"),
            )
    }

    pub async fn run(&self, check_type: CheckType, settings: &CheckSettings) -> AggregateResult {
        let mut resolver = self.resolver();
        run_check(check_type, &mut resolver, settings).await
    }

    /// Session cookies currently persisted in the store
    pub fn stored_jar(&self) -> CookieJar {
        self.store
            .snapshot()
            .map(|data| CookieJar::from_bytes(&data))
            .unwrap_or_default()
    }

    pub fn assert_requested(&self, path: &str, expected: usize) -> Result<()> {
        let actual = self.transport.count(path);
        if actual != expected {
            anyhow::bail!(
                "Expected {} requests to {}, got {} (seen: {:?})",
                expected,
                path,
                actual,
                self.transport.paths()
            );
        }
        log::info!("✅ {} requested {} times as expected", path, actual);
        Ok(())
    }

    pub fn assert_cookie_stored(&self, name: &str, value: &str) -> Result<()> {
        match self.stored_jar().get(name) {
            Some(stored) if stored == value => Ok(()),
            other => anyhow::bail!("Cookie {} expected {:?}, stored {:?}", name, value, other),
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// First candidate path of a query
pub fn first(query: &thecus_core::EndpointQuery) -> &str {
    &query.candidates()[0]
}

/// Declares an async test that receives a fresh harness
#[macro_export]
macro_rules! device_test {
    ($name:ident, |$harness:ident| $body:block) => {
        #[tokio::test]
        async fn $name() {
            async fn body($harness: &$crate::test_utils::TestHarness) -> $crate::anyhow::Result<()> {
                $body
            }

            let harness = $crate::test_utils::TestHarness::new();
            if let Err(e) = body(&harness).await {
                panic!("Test '{}' failed: {}", stringify!($name), e);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use thecus_core::Severity;

    #[tokio::test]
    async fn test_healthy_device_runs_clean() {
        let harness = TestHarness::new();
        harness.healthy_device();

        let result = harness.run(CheckType::Health, &CheckSettings::default()).await;
        assert_eq!(result.severity, Severity::Ok);
        assert_eq!(
            result.texts,
            vec!["Hardware working fine", "RAID Healthy"]
        );
        assert_eq!(result.perf_metrics, vec!["Disk1_temp=36;55;60"]);
    }

    #[test]
    fn test_with_session_seeds_store() {
        let harness = TestHarness::new().with_session("PHPSESSID=old");
        harness.assert_cookie_stored("PHPSESSID", "old").unwrap();
    }

    device_test!(test_macro_runs_body, |harness| {
        harness.device("/x", serde_json::json!({"a": 1}));
        let mut client = harness.client();
        let response = client.request("/x", None).await?;
        assert_eq!(response.number("a"), Some(1.0));
        harness.assert_requested("/x", 1)?;
        Ok(())
    });
}

mod utils;
#[allow(unused)]
use utils::*;

#[cfg(feature = "integration")]
mod tests {
    use super::*;

    use stampede::prelude::*;
    use std::time::Duration;

    #[tokio::test]
    async fn fast_target_all_successes() {
        init().await;

        let config = RunConfig::new("http://0.0.0.0:3010/delay/ms/1", 10, Duration::from_secs(1))
            .check(Check::StatusCode(200))
            .check(Check::BodyContains("ok".to_string()));
        let snapshot = stampede::start_http(config)
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert!(snapshot.total() > 0);
        assert_eq!(snapshot.failures(), 0);
        assert_eq!(snapshot.slots_abandoned, 0);
    }

    #[tokio::test]
    async fn error_target_all_check_failures() {
        init().await;

        let config = RunConfig::new("http://0.0.0.0:3010/status/500", 5, Duration::from_secs(1))
            .check(Check::StatusCode(200));
        let snapshot = stampede::start_http(config)
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert!(snapshot.total() > 0);
        assert_eq!(snapshot.check_failures, snapshot.total());
        assert_eq!(snapshot.successes, 0);
    }

    #[tokio::test]
    async fn ramped_run_reaches_full_population() {
        init().await;

        let config = RunConfig::new("http://0.0.0.0:3010/ok", 20, Duration::from_secs(2))
            .ramp_up(Duration::from_secs(1))
            .check(Check::StatusCode(200));
        let handle = stampede::start_http(config).unwrap();

        tokio::time::sleep(Duration::from_millis(1_300)).await;
        assert_eq!(handle.active_vus(), 20);

        let snapshot = handle.wait().await.unwrap();
        assert_eq!(snapshot.failures(), 0);
        assert!(snapshot.total() > 20);
    }

    #[tokio::test]
    async fn unreachable_target_all_transport_errors() {
        init().await;

        // Nothing listens on this port.
        let config = RunConfig::new("http://0.0.0.0:39999/ok", 3, Duration::from_secs(1));
        let snapshot = stampede::start_http(config)
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert!(snapshot.total() > 0);
        assert_eq!(snapshot.transport_errors, snapshot.total());
    }
}

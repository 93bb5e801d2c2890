use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn mount_function(
        mock_server: &MockServer,
        function: &str,
        status: u16,
        mock_response: &str,
    ) {
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", function))
            .and(query_param("symbol", "IBM"))
            .and(query_param("apikey", "demo"))
            .respond_with(ResponseTemplate::new(status).set_body_string(mock_response))
            .mount(mock_server)
            .await;
    }

    pub fn write_config(dir: &std::path::Path, base_url: &str, functions: &[&str]) -> String {
        let key_file = dir.join("av.key");
        std::fs::write(&key_file, "demo\n").expect("Failed to write key file");

        let config_path = dir.join("config.yaml");
        let functions = functions
            .iter()
            .map(|f| format!("  - {f}"))
            .collect::<Vec<_>>()
            .join("\n");
        let config_content = format!(
            r#"
alpha_vantage:
  base_url: "{base_url}/query"
  key_file: "{}"
  request_interval_secs: 0
  retry_delay_ms: 0
functions:
{functions}
output_dir: "{}"
"#,
            key_file.display(),
            dir.display()
        );
        std::fs::write(&config_path, config_content).expect("Failed to write config file");
        config_path.to_string_lossy().into_owned()
    }
}

const DAILY_RESPONSE: &str = r#"{
    "Meta Data": {
        "1. Information": "Daily Time Series with Splits and Dividend Events",
        "2. Symbol": "IBM"
    },
    "Time Series (Daily)": {
        "2023-05-01": {"1. open": "10.00", "4. close": "10.00", "6. volume": "1000"},
        "2023-05-02": {"1. open": "12.00", "4. close": "12.00", "6. volume": "1200"},
        "2023-06-01": {"1. open": "22.00", "4. close": "44.00", "6. volume": "2200"}
    }
}"#;

const WEEKLY_RESPONSE: &str = r#"{
    "Meta Data": {"2. Symbol": "IBM"},
    "Weekly Time Series": {
        "2023-05-05": {"4. close": "22.00", "currency": "USD"}
    }
}"#;

fn read_monthly(dir: &Path) -> serde_json::Value {
    let content = fs::read_to_string(dir.join("monthly.json")).expect("monthly.json missing");
    serde_json::from_str(&content).expect("monthly.json is not valid JSON")
}

#[test_log::test(tokio::test)]
async fn test_full_run_with_partial_failure() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_function(
        &mock_server,
        "TIME_SERIES_DAILY_ADJUSTED",
        200,
        DAILY_RESPONSE,
    )
    .await;
    test_utils::mount_function(&mock_server, "OVERVIEW", 500, "").await;
    test_utils::mount_function(&mock_server, "TIME_SERIES_WEEKLY", 200, WEEKLY_RESPONSE).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(
        temp_dir.path(),
        &mock_server.uri(),
        &["TIME_SERIES_DAILY_ADJUSTED", "OVERVIEW", "TIME_SERIES_WEEKLY"],
    );

    let result = avmonthly::run_command(
        avmonthly::AppCommand::Run {
            symbol: Some("ibm".to_string()),
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Run failed with: {:?}", result.err());

    let symbol_dir = temp_dir.path().join("IBM");
    assert_eq!(
        fs::read_to_string(symbol_dir.join("TIME_SERIES_DAILY_ADJUSTED.json")).unwrap(),
        DAILY_RESPONSE
    );
    assert!(symbol_dir.join("TIME_SERIES_WEEKLY.json").exists());
    assert!(!symbol_dir.join("OVERVIEW.json").exists());

    let monthly = read_monthly(temp_dir.path());
    info!(%monthly, "Monthly report");
    assert_eq!(
        monthly,
        serde_json::json!({
            "Monthly Data": {
                "2023-05": {"1. open": 1.0, "4. close": 2.0, "6. volume": 100.0},
                "2023-06": {"1. open": 1.0, "4. close": 2.0, "6. volume": 100.0}
            }
        })
    );
}

#[test_log::test(tokio::test)]
async fn test_run_is_repeatable() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_function(
        &mock_server,
        "TIME_SERIES_DAILY_ADJUSTED",
        200,
        DAILY_RESPONSE,
    )
    .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(
        temp_dir.path(),
        &mock_server.uri(),
        &["TIME_SERIES_DAILY_ADJUSTED"],
    );

    let mut outputs = Vec::new();
    for _ in 0..2 {
        avmonthly::run_command(
            avmonthly::AppCommand::Run {
                symbol: Some("IBM".to_string()),
            },
            Some(&config_path),
        )
        .await
        .expect("Run failed");
        outputs.push(fs::read(temp_dir.path().join("monthly.json")).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test_log::test(tokio::test)]
async fn test_missing_symbol_is_an_error() {
    let result = avmonthly::run_command(avmonthly::AppCommand::Run { symbol: None }, None).await;
    let err = result.expect_err("Missing symbol should fail");
    assert!(err.to_string().contains("Usage"));

    let result = avmonthly::run_command(
        avmonthly::AppCommand::Run {
            symbol: Some("  ".to_string()),
        },
        None,
    )
    .await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_missing_key_file_aborts_before_requests() {
    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::any())
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("{}"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(temp_dir.path(), &mock_server.uri(), &["OVERVIEW"]);
    fs::remove_file(temp_dir.path().join("av.key")).unwrap();

    let result = avmonthly::run_command(
        avmonthly::AppCommand::Run {
            symbol: Some("IBM".to_string()),
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_err());
    assert!(!temp_dir.path().join("monthly.json").exists());
}

#[test_log::test(tokio::test)]
async fn test_aggregate_command_reads_saved_payloads() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let daily = temp_dir.path().join("TIME_SERIES_DAILY.json");
    fs::write(&daily, DAILY_RESPONSE).unwrap();
    let output = temp_dir.path().join("report.json");

    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "averaging:\n  mode: contributing_days\n").unwrap();

    avmonthly::run_command(
        avmonthly::AppCommand::Aggregate {
            files: vec![daily],
            output: Some(output.clone()),
        },
        config_path.to_str(),
    )
    .await
    .expect("Aggregate failed");

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(report["Monthly Data"]["2023-05"]["4. close"], 11.0);
    assert_eq!(report["Monthly Data"]["2023-06"]["6. volume"], 2200.0);
}

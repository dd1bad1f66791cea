use fronius_config::AppConfig;

// 环境变量是进程级共享状态，串在一个用例里避免并发测试互相干扰。
#[test]
fn load_config_from_env() {
    std::env::set_var("PORT", "3100");
    std::env::set_var("FRONIUS_POLL_INTERVAL_MS", "1500");
    std::env::set_var("LIVEONE_API_KEY", "fr_test_key");

    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.port, 3100);
    assert_eq!(config.http_addr, "0.0.0.0:3100");
    assert_eq!(config.poll_interval_ms, 1500);
    assert_eq!(config.liveone_api_key.as_deref(), Some("fr_test_key"));
    assert_eq!(config.liveone_server, None);

    std::env::set_var("PORT", "not-a-port");
    let err = AppConfig::from_env().expect_err("invalid port");
    assert!(err.to_string().contains("PORT"));

    std::env::remove_var("PORT");
    std::env::remove_var("FRONIUS_POLL_INTERVAL_MS");
    std::env::remove_var("LIVEONE_API_KEY");
}

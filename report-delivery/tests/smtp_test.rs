use interfaces::defs::ReportSender;
use report_delivery::{SmtpConfig, SmtpSender};

fn local_config() -> SmtpConfig {
    SmtpConfig {
        host: "127.0.0.1".to_string(),
        port: 2525,
        username: None,
        password: None,
        use_tls: false,
        from: "monitor@example.com".to_string(),
    }
}

#[test]
fn requires_host_and_sender() {
    let mut config = local_config();
    config.host.clear();
    assert!(SmtpSender::new(&config, vec![]).is_err());

    let mut config = local_config();
    config.from.clear();
    assert!(SmtpSender::new(&config, vec![]).is_err());
}

#[tokio::test]
async fn malformed_recipient_is_a_failed_delivery() {
    let sender = SmtpSender::new(&local_config(), vec![]).unwrap();
    assert!(!sender.send("<p>x</p>", &["not an address".to_string()], Some("Subject")).await);
}

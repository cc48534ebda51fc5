
use super::*;

fn test_config() -> SshConfig {
    SshConfig {
        host: "10.10.40.79".to_string(),
        port: 22,
        user: "logs".to_string(),
        password: "secret".to_string(),
        ..Default::default()
    }
}

#[test]
fn test_destination() {
    let executor = SshExecutor::new(test_config());
    assert_eq!(executor.destination(), "logs@10.10.40.79");
}

#[test]
fn test_build_args_basic() {
    let executor = SshExecutor::new(test_config());
    let args = executor.build_args("free -m");

    assert_eq!(args[0], "-e");
    assert_eq!(args[1], "ssh");
    assert!(args.contains(&"-p".to_string()));
    assert!(args.contains(&"22".to_string()));
    assert!(args.contains(&"ConnectTimeout=10".to_string()));
    assert_eq!(args[args.len() - 2], "logs@10.10.40.79");
    assert_eq!(args[args.len() - 1], "free -m");
}

#[test]
fn test_build_args_algorithm_allowlists() {
    let mut config = test_config();
    config.hostkey_algorithms = Some("ssh-rsa".to_string());
    config.pubkey_accepted_types = Some("ssh-rsa,ssh-ed25519".to_string());

    let executor = SshExecutor::new(config);
    let args = executor.build_args("uptime");

    assert!(args.contains(&"HostKeyAlgorithms=ssh-rsa".to_string()));
    assert!(args.contains(&"PubkeyAcceptedKeyTypes=ssh-rsa,ssh-ed25519".to_string()));
}

#[test]
fn test_build_args_custom_port() {
    let mut config = test_config();
    config.port = 2222;

    let executor = SshExecutor::new(config);
    let args = executor.build_args("uptime");
    let pos = args.iter().position(|a| a == "-p").unwrap();
    assert_eq!(args[pos + 1], "2222");
}

#[test]
fn test_password_not_in_args() {
    let executor = SshExecutor::new(test_config());
    let args = executor.build_args("uptime");
    assert!(!args.iter().any(|a| a.contains("secret")));
}

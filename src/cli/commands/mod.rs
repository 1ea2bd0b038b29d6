use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

mod families;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let cmd = Command::new("clickhouse_exporter")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(built_info::GIT_COMMIT_HASH.unwrap_or(env!("CARGO_PKG_VERSION")))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("9116")
                .env("CLICKHOUSE_EXPORTER_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("listen")
                .long("listen")
                .help("IP address to listen on, [::] falling back to 0.0.0.0 when unset")
                .env("CLICKHOUSE_EXPORTER_LISTEN")
                .value_name("IP"),
        )
        .arg(
            Arg::new("telemetry-path")
                .long("telemetry-path")
                .help("Path under which to expose metrics")
                .default_value("/metrics")
                .env("CLICKHOUSE_EXPORTER_TELEMETRY_PATH")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("uri")
                .long("uri")
                .help("ClickHouse HTTP interface")
                .default_value("http://localhost:8123/")
                .env("CLICKHOUSE_URI")
                .value_name("URI"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .help("ClickHouse user, sent as X-ClickHouse-User")
                .env("CLICKHOUSE_USER")
                .value_name("USER"),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .help("ClickHouse password, sent as X-ClickHouse-Key")
                .env("CLICKHOUSE_PASSWORD")
                .hide_env_values(true)
                .value_name("PASSWORD"),
        )
        .arg(
            Arg::new("insecure")
                .long("insecure")
                .help("Skip TLS certificate verification")
                .default_value("true")
                .env("CLICKHOUSE_INSECURE")
                .value_parser(clap::value_parser!(bool))
                .value_name("BOOL"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Timeout of each ClickHouse request, in seconds")
                .default_value("30")
                .env("CLICKHOUSE_EXPORTER_TIMEOUT")
                .value_parser(clap::value_parser!(u64).range(1..))
                .value_name("SECONDS"),
        )
        .arg(
            Arg::new("filters")
                .long("filters")
                .help("YAML file with per family query filters")
                .env("CLICKHOUSE_EXPORTER_FILTERS")
                .value_parser(clap::value_parser!(std::path::PathBuf))
                .value_name("FILE"),
        )
        .arg(
            Arg::new("clickhouse-only")
                .long("clickhouse-only")
                .help("Expose only ClickHouse metrics, not the exporter's own process metrics")
                .env("CLICKHOUSE_EXPORTER_CLICKHOUSE_ONLY")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase verbosity, -vv for debug")
                .action(ArgAction::Count),
        );

    families::add_families_args(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const ENV: [(&str, Option<&str>); 10] = [
        ("CLICKHOUSE_EXPORTER_PORT", None),
        ("CLICKHOUSE_EXPORTER_LISTEN", None),
        ("CLICKHOUSE_EXPORTER_TELEMETRY_PATH", None),
        ("CLICKHOUSE_URI", None),
        ("CLICKHOUSE_USER", None),
        ("CLICKHOUSE_PASSWORD", None),
        ("CLICKHOUSE_INSECURE", None),
        ("CLICKHOUSE_EXPORTER_TIMEOUT", None),
        ("CLICKHOUSE_EXPORTER_FILTERS", None),
        ("CLICKHOUSE_EXPORTER_CLICKHOUSE_ONLY", None),
    ];

    #[test]
    fn test_defaults() {
        temp_env::with_vars(ENV, || {
            let matches = new().get_matches_from(vec!["clickhouse_exporter"]);

            assert_eq!(matches.get_one::<u16>("port").copied(), Some(9116));
            assert_eq!(matches.get_one::<String>("listen"), None);
            assert_eq!(
                matches.get_one::<String>("telemetry-path").map(String::as_str),
                Some("/metrics")
            );
            assert_eq!(
                matches.get_one::<String>("uri").map(String::as_str),
                Some("http://localhost:8123/")
            );
            assert_eq!(matches.get_one::<String>("user"), None);
            assert_eq!(matches.get_one::<String>("password"), None);
            assert_eq!(matches.get_one::<bool>("insecure").copied(), Some(true));
            assert_eq!(matches.get_one::<u64>("timeout").copied(), Some(30));
            assert_eq!(matches.get_one::<PathBuf>("filters"), None);
            assert!(!matches.get_flag("clickhouse-only"));
        });
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "clickhouse_exporter");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            env!("CARGO_PKG_DESCRIPTION")
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_flags() {
        temp_env::with_vars(ENV, || {
            let matches = new().get_matches_from(vec![
                "clickhouse_exporter",
                "--port",
                "8080",
                "--uri",
                "https://clickhouse.example:8443/?database=system",
                "--user",
                "monitoring",
                "--password",
                "secret",
                "--insecure",
                "false",
                "--timeout",
                "5",
                "--filters",
                "/etc/clickhouse_exporter/filters.yaml",
                "--clickhouse-only",
            ]);

            assert_eq!(matches.get_one::<u16>("port").copied(), Some(8080));
            assert_eq!(
                matches.get_one::<String>("uri").map(String::as_str),
                Some("https://clickhouse.example:8443/?database=system")
            );
            assert_eq!(
                matches.get_one::<String>("user").map(String::as_str),
                Some("monitoring")
            );
            assert_eq!(matches.get_one::<bool>("insecure").copied(), Some(false));
            assert_eq!(matches.get_one::<u64>("timeout").copied(), Some(5));
            assert_eq!(
                matches.get_one::<PathBuf>("filters"),
                Some(&PathBuf::from("/etc/clickhouse_exporter/filters.yaml"))
            );
            assert!(matches.get_flag("clickhouse-only"));
        });
    }

    #[test]
    fn test_env() {
        temp_env::with_vars(
            [
                ("CLICKHOUSE_URI", Some("http://ch:8123/")),
                ("CLICKHOUSE_USER", Some("default")),
                ("CLICKHOUSE_EXPORTER_PORT", Some("9999")),
                ("CLICKHOUSE_EXPORTER_TIMEOUT", Some("10")),
            ],
            || {
                let matches = new().get_matches_from(vec!["clickhouse_exporter"]);

                assert_eq!(
                    matches.get_one::<String>("uri").map(String::as_str),
                    Some("http://ch:8123/")
                );
                assert_eq!(
                    matches.get_one::<String>("user").map(String::as_str),
                    Some("default")
                );
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(9999));
                assert_eq!(matches.get_one::<u64>("timeout").copied(), Some(10));
            },
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = new().try_get_matches_from(vec!["clickhouse_exporter", "--timeout", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_family_flags_exist() {
        let matches = new().get_matches_from(vec![
            "clickhouse_exporter",
            "--no-collector.query_log",
            "--collector.disks",
        ]);

        assert!(matches.get_flag("no-collector.query_log"));
        assert!(matches.get_flag("collector.disks"));
        assert!(!matches.get_flag("no-collector.basic"));
    }
}

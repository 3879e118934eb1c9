use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "nutricoach=warn,nutricoach_core=warn";
const SERVE_FILTER: &str = "nutricoach=info,nutricoach_core=info,tower_http=info";

/// Install the global subscriber. Logs go to stderr so `--json` output on
/// stdout stays machine-readable.
///
/// `NUTRICOACH_LOG` overrides the filter; `NUTRICOACH_LOG_FORMAT=json`
/// switches to JSON lines.
pub fn init_tracing(serving: bool) {
    let default = if serving { SERVE_FILTER } else { DEFAULT_FILTER };
    let env_filter = std::env::var("NUTRICOACH_LOG").unwrap_or_else(|_| default.to_string());
    let json_logs = std::env::var("NUTRICOACH_LOG_FORMAT").is_ok_and(|v| v == "json");

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_writer(std::io::stderr);

    let result = if json_logs {
        builder.with_target(false).json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("Warning: could not install logger: {e}");
    }
}

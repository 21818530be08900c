use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the global subscriber. Logs go to stderr; stdout is the protocol.
pub fn init_logging(verbosity: u8) {
	// 0 = errors only
	// 1 (-v) = info for the server, warn for the runtime
	// 2+ (-vv) = debug for everything, including every dispatch
	let filter = match verbosity {
		0 => "error",
		1 => "info,pw_dispatch_runtime=warn",
		_ => "debug",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_ansi(false)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}

use clap::{Parser, ValueEnum};

/// Live stream listing service with a refresh-ahead cache.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable, colored output for local development
    Pretty,
    /// Structured JSON for log aggregation
    Json,
}

/// Pretty in debug builds, JSON in release builds.
fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tracing_flag() {
        let args = Args::try_parse_from(["livefeed", "--tracing", "json"]).unwrap();
        assert_eq!(args.tracing, TracingFormat::Json);
        assert!(Args::try_parse_from(["livefeed", "--tracing", "xml"]).is_err());
    }

    #[test]
    fn args_definition_is_valid() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}

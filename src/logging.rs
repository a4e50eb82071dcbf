use {
    anyhow::Result,
    std::{
        fs::File,
        path::Path,
        sync::Arc,
    },
    tracing::Level,
    tracing_subscriber::{
        fmt::{
            layer,
            writer::MakeWriterExt,
        },
        layer::SubscriberExt,
        util::SubscriberInitExt,
    },
};

/// Install the global subscriber.
///
/// Stdout always gets a pretty layer, a log file only gets written when a
/// `path` is given. Levels default to INFO.
pub fn setup_logging(
    path: Option<&Path>,
    min_level_file: Option<Level>,
    min_level_stdout: Option<Level>,
) -> Result<()> {
    let file_layer = match path {
        Some(path) => {
            let log_file = Arc::new(File::create(path)?);
            Some(
                layer()
                    .with_writer(log_file.with_max_level(min_level_file.unwrap_or(Level::INFO)))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            layer()
                .with_writer(std::io::stdout.with_max_level(min_level_stdout.unwrap_or(Level::INFO)))
                .compact()
                .pretty()
                .with_line_number(true)
                .with_thread_ids(false)
                .with_target(false),
        )
        .try_init()?;

    Ok(())
}

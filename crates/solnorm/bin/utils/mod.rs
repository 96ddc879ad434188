use eyre::{EyreHandler, Result, WrapErr};
use serde::Serialize;
use std::{error::Error, fs, io::Write, path::Path};
use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yansi::Paint;

/// Reports errors to the user: the failure in red, then each cause on its own line, then a
/// hint when the build directory itself is unusable.
#[derive(Debug)]
struct Handler;

impl EyreHandler for Handler {
    fn debug(
        &self,
        error: &(dyn Error + 'static),
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        if f.alternate() {
            return core::fmt::Debug::fmt(error, f);
        }
        writeln!(f)?;
        write!(f, "{}", error.red())?;

        let causes: Vec<_> = std::iter::successors(error.source(), |e| (*e).source()).collect();
        if !causes.is_empty() {
            write!(f, "\n\nCaused by:")?;
            for cause in &causes {
                write!(f, "\n  {cause}")?;
            }
        }

        if let Some(hint) = hint(error) {
            write!(f, "\n\n{}", hint.yellow())?;
        }
        Ok(())
    }
}

/// A suggestion for errors the user can fix in their project.
fn hint(error: &(dyn Error + 'static)) -> Option<&'static str> {
    let unusable_build = std::iter::successors(Some(error), |e| (*e).source())
        .filter_map(|e| e.downcast_ref::<solnorm_backend::Error>())
        .any(solnorm_backend::Error::is_build_artifacts);
    unusable_build.then_some(
        "Build the project first, or point --build-dir at its build output.",
    )
}

/// Installs the solnorm eyre hook as the global error report hook.
///
/// Errors are printed by [`Handler`] unless `SOLNORM_DEBUG` is set, in which case the
/// `color-eyre` handler with span traces is used. Panics always go to `color-eyre`.
pub fn install_error_handler() {
    if std::env::var_os("RUST_BACKTRACE").is_none() {
        std::env::set_var("RUST_BACKTRACE", "full");
    }

    let debug_enabled = std::env::var("SOLNORM_DEBUG").is_ok();
    if debug_enabled {
        if let Err(e) = color_eyre::install() {
            warn!("failed to install color eyre error hook: {e}");
        }
    } else {
        let (panic_hook, _) = color_eyre::config::HookBuilder::default()
            .panic_section(concat!(
                "solnorm crashed. Please report it at ",
                env!("CARGO_PKG_REPOSITORY"),
                "/issues with the command line you ran."
            ))
            .into_hooks();
        panic_hook.install();
        if let Err(e) = eyre::set_hook(Box::new(move |_| Box::new(Handler))) {
            warn!("failed to install solnorm error hook: {e}");
        }
    }
}

/// Initializes a tracing Subscriber for logging
pub fn subscriber() {
    tracing_subscriber::Registry::default()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init()
}

/// Sets the default [`yansi`] color output condition.
pub fn enable_paint() {
    let enable = yansi::Condition::os_support() && yansi::Condition::tty_and_color_live();
    yansi::whenever(yansi::Condition::cached(enable));
}

/// Reads and parses a JSON document.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).wrap_err_with(|| format!("invalid JSON in {}", path.display()))
}

/// Serializes `value` as JSON, pretty-printed if requested.
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty { serde_json::to_string_pretty(value)? } else { serde_json::to_string(value)? })
}

/// Writes `content` to `output`, or to stdout when no file is given.
pub fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, format!("{content}\n"))
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            debug!(?path, "output written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{content}")?;
        }
    }
    Ok(())
}

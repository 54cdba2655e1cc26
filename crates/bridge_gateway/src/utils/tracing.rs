use std::fmt;
use std::sync::OnceLock;

use time::macros::format_description;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format, time::FormatTime, FmtContext, FormatEvent, FormatFields, FormattedFields,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

struct BracketedTime;

impl FormatTime for BracketedTime {
    fn format_time(&self, w: &mut format::Writer<'_>) -> fmt::Result {
        let now = time::OffsetDateTime::now_utc();
        let formatted = now
            .format(&format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
            ))
            .map_err(|_| fmt::Error)?;
        write!(w, "[{}]", formatted)
    }
}

struct BracketedFormatter;

impl<S, N> FormatEvent<S, N> for BracketedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        BracketedTime.format_time(&mut writer)?;

        write!(
            writer,
            "[{}]",
            event.metadata().level().to_string().to_lowercase()
        )?;

        // Surface the innermost request_id carried by an enclosing span
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let extensions = span.extensions();
                let Some(fields) = extensions.get::<FormattedFields<N>>() else {
                    continue;
                };
                if let Some(request_id) = request_id_field(fields.fields.as_str()) {
                    write!(writer, " request_id={}", request_id)?;
                    break;
                }
            }
        }

        write!(writer, " ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

fn request_id_field(fields: &str) -> Option<&str> {
    const KEY: &str = "request_id=";
    let start = fields.find(KEY)? + KEY.len();
    let rest = &fields[start..];
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    Some(&rest[..end])
}

static INIT_LOGGER: OnceLock<()> = OnceLock::new();

/// Install the global subscriber once. `RUST_LOG` overrides the `info` default.
///
/// Records emitted through the `log` facade by the conversion crate are
/// bridged into the same output.
pub fn init_logging() {
    INIT_LOGGER.get_or_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        // No ANSI to keep fields parseable
        let fmt_layer = tracing_subscriber::fmt::layer()
            .event_format(BracketedFormatter)
            .fmt_fields(format::DefaultFields::new())
            .with_ansi(false);

        if let Err(e) = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
        {
            eprintln!("tracing subscriber already installed: {}", e);
        }
    });
}

//! Command output: a human rendering and the `tasklink.v1` JSON envelope.
//!
//! Every command builds one [`HumanOutput`] alongside its serializable
//! report. `--json` prints the report inside the envelope, carrying the
//! human warnings and next steps with it; `--quiet` prints nothing on
//! success.

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};

pub const SCHEMA_VERSION: &str = "tasklink.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Text shown to a person: a header line, `key value` pairs, free-form
/// rows (task lines), then warnings and suggested commands.
#[derive(Debug, Clone, Default)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    /// An empty `value` renders the key alone.
    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum Status {
    Success,
    Error,
}

#[derive(Serialize)]
struct Envelope<'a, B: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: Status,
    #[serde(flatten)]
    body: B,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    next_steps: &'a [String],
}

#[derive(Serialize)]
struct Data<'a, T: Serialize> {
    data: &'a T,
}

#[derive(Serialize)]
struct Failure<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn print_envelope<B: Serialize>(envelope: &Envelope<'_, B>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        return print_envelope(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: Status::Success,
            body: Data { data },
            warnings: human.map(|h| h.warnings.as_slice()).unwrap_or_default(),
            next_steps: human.map(|h| h.next_steps.as_slice()).unwrap_or_default(),
        });
    }

    if let Some(human) = human.filter(|_| !options.quiet) {
        println!("{}", format_human(human));
    }
    Ok(())
}

/// Report a failed command. Errors are shown even under `--quiet`.
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hints = recovery_hints(err);

    if json {
        let message = err.to_string();
        return print_envelope(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: Status::Error,
            body: Failure {
                error: ErrorBody {
                    message: &message,
                    code: err.exit_code(),
                    kind: error_kind(err),
                    details: err.details(),
                },
            },
            warnings: &[],
            next_steps: &hints,
        });
    }

    eprintln!("error: {err}");
    for hint in &hints {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = vec![output.header.clone()];

    let width = output
        .summary
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, _)| key.len())
        .max()
        .unwrap_or(0);
    for (key, value) in &output.summary {
        if value.is_empty() {
            lines.push(format!("  {key}"));
        } else {
            lines.push(format!("  {key:<width$}  {value}"));
        }
    }

    if !output.details.is_empty() {
        lines.push(String::new());
        lines.extend(output.details.iter().map(|row| format!("  {row}")));
    }

    if !output.warnings.is_empty() || !output.next_steps.is_empty() {
        lines.push(String::new());
    }
    lines.extend(output.warnings.iter().map(|w| format!("warning: {w}")));
    lines.extend(output.next_steps.iter().map(|step| format!("try: {step}")));

    lines.join("\n")
}

pub fn infer_command_name_from_args() -> String {
    infer_command_name(std::env::args().skip(1))
}

/// First non-flag argument, plus the second for `theme`.
pub fn infer_command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut words = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if matches!(arg.as_str(), "--store" | "--config") {
            args.next();
            continue;
        }
        if !arg.starts_with('-') {
            words.push(arg);
        }
    }

    match words.as_slice() {
        [] => "tasklink".to_string(),
        [group, sub, ..] if group == "theme" => format!("{group} {sub}"),
        [command, ..] => command.clone(),
    }
}

fn error_kind(err: &Error) -> &'static str {
    if err.exit_code() == exit_codes::USER_ERROR {
        "user_error"
    } else {
        "operation_failed"
    }
}

fn recovery_hints(err: &Error) -> Vec<String> {
    let hint = match err {
        Error::TaskNotFound(_) | Error::AmbiguousTaskId(_) => "tasklink list",
        Error::LockFailed(_) => "another tasklink process holds the store; retry when it exits",
        Error::InvalidConfig(_) => "fix tasklink.toml then retry",
        Error::MalformedShareData(_) => "tasklink link",
        _ => return Vec::new(),
    };
    vec![hint.to_string()]
}

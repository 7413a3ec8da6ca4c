//! tasklink share commands
//!
//! `link` and `export` print the current list in shareable form. `open`
//! and `import` behave like visiting a share link: valid data replaces
//! the local list, malformed data is reported and leaves it empty.

use serde::Serialize;
use url::Url;

use crate::cli::task::push_load_warnings;
use crate::cli::Context;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::session::{LoadReport, Session};

#[derive(Serialize)]
struct LinkReport {
    url: String,
    payload: String,
    tasks: usize,
}

pub fn run_link(ctx: &Context) -> Result<()> {
    let mut session = ctx.open_session()?;
    session.close();
    let report = link_report(&session)?;

    let mut human = HumanOutput::new(report.url.clone());
    push_load_warnings(&mut human, session.load_report());
    if report.tasks > 0 && report.url.len() > ctx.config.share.max_url_len {
        human.push_warning("share link is very long and may be truncated by some clients");
    }

    emit_success(ctx.output, "link", &report, Some(&human))
}

pub fn run_export(ctx: &Context) -> Result<()> {
    let mut session = ctx.open_session()?;
    session.close();
    let report = link_report(&session)?;

    let mut human = HumanOutput::new(report.payload.clone());
    push_load_warnings(&mut human, session.load_report());

    emit_success(ctx.output, "export", &report, Some(&human))
}

pub fn run_open(ctx: &Context, raw: &str) -> Result<()> {
    let url = Url::parse(raw.trim())?;
    let mut session = ctx.open_session()?;
    session.navigate(&url)?;
    session.close();

    emit_load(ctx, "open", session.load_report())
}

pub fn run_import(ctx: &Context, payload: &str) -> Result<()> {
    let mut session = ctx.open_session()?;
    session.import(payload)?;
    session.close();

    emit_load(ctx, "import", session.load_report())
}

fn link_report(session: &Session) -> Result<LinkReport> {
    Ok(LinkReport {
        url: session.share_url()?.to_string(),
        payload: session.share_payload()?,
        tasks: session.tasks().len(),
    })
}

fn emit_load(ctx: &Context, command: &str, report: &LoadReport) -> Result<()> {
    let header = match report.imported {
        Some(count) => format!("tasklink {command}: imported {count} task(s)"),
        None if report.malformed.is_some() => format!(
            "tasklink {command}: share data ignored, {} local task(s) cleared",
            report.discarded.unwrap_or(0)
        ),
        None => format!("tasklink {command}: no share data, local list kept"),
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("tasks", report.tasks.to_string());
    human.push_summary("link", report.address.clone());
    push_load_warnings(&mut human, report);
    human.push_next_step("tasklink list");

    emit_success(ctx.output, command, report, Some(&human))
}

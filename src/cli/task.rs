//! tasklink task commands
//!
//! Provides add, check/uncheck/toggle, rm and list.

use serde::Serialize;

use crate::address::Published;
use crate::cli::Context;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::session::{LoadReport, Session};
use crate::task::Task;

#[derive(Serialize)]
struct TaskReport<'a> {
    task: &'a Task,
    link: &'a Published,
}

#[derive(Serialize)]
struct ListReport<'a> {
    tasks: &'a [Task],
    total: usize,
    done: usize,
}

pub fn run_add(ctx: &Context, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::InvalidArgument("task text cannot be empty".to_string()));
    }

    let mut session = ctx.open_session()?;
    let change = session
        .add(text)?
        .ok_or_else(|| Error::InvalidArgument("task text cannot be empty".to_string()))?;
    session.close();

    let mut human = HumanOutput::new(format!("tasklink add: {}", change.value.text));
    human.push_summary("id", short_id(&change.value.id));
    push_load_warnings(&mut human, session.load_report());
    push_link(&mut human, &change.published);
    human.push_next_step(format!("tasklink check {}", short_id(&change.value.id)));

    emit_success(
        ctx.output,
        "add",
        &TaskReport {
            task: &change.value,
            link: &change.published,
        },
        Some(&human),
    )
}

/// `checked = None` flips the current state.
pub fn run_set_checked(ctx: &Context, query: &str, checked: Option<bool>) -> Result<()> {
    let mut session = ctx.open_session()?;
    let id = session.resolve_id(query)?;
    let change = match checked {
        Some(checked) => session.set_checked(&id, checked)?,
        None => session.toggle(&id)?,
    };
    session.close();

    let command = match checked {
        Some(true) => "check",
        Some(false) => "uncheck",
        None => "toggle",
    };
    let state = if change.value.is_checked { "done" } else { "open" };

    let mut human = HumanOutput::new(format!("tasklink {command}: {}", change.value.text));
    human.push_summary("id", short_id(&change.value.id));
    human.push_summary("state", state);
    push_load_warnings(&mut human, session.load_report());
    push_link(&mut human, &change.published);

    emit_success(
        ctx.output,
        command,
        &TaskReport {
            task: &change.value,
            link: &change.published,
        },
        Some(&human),
    )
}

pub fn run_remove(ctx: &Context, query: &str) -> Result<()> {
    let mut session = ctx.open_session()?;
    let id = session.resolve_id(query)?;
    let change = session.remove(&id)?;
    session.close();
    let task = change
        .value
        .ok_or_else(|| Error::TaskNotFound(query.to_string()))?;

    let mut human = HumanOutput::new(format!("tasklink rm: {}", task.text));
    human.push_summary("id", short_id(&task.id));
    human.push_summary("remaining", session.tasks().len().to_string());
    push_load_warnings(&mut human, session.load_report());
    push_link(&mut human, &change.published);

    emit_success(
        ctx.output,
        "rm",
        &TaskReport {
            task: &task,
            link: &change.published,
        },
        Some(&human),
    )
}

pub fn run_list(ctx: &Context) -> Result<()> {
    let mut session = ctx.open_session()?;
    session.close();

    let human = render_list(&session);
    let tasks = session.tasks();
    emit_success(
        ctx.output,
        "list",
        &ListReport {
            tasks,
            total: tasks.len(),
            done: tasks.iter().filter(|task| task.is_checked).count(),
        },
        Some(&human),
    )
}

fn render_list(session: &Session) -> HumanOutput {
    let tasks = session.tasks();
    let done = tasks.iter().filter(|task| task.is_checked).count();

    let mut human = HumanOutput::new(format!("tasklink list: {done}/{} done", tasks.len()));
    for task in tasks {
        let mark = if task.is_checked { "x" } else { " " };
        let when = task
            .created_at()
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        human.push_detail(format!("[{mark}] {}  {when}  {}", short_id(&task.id), task.text));
    }
    push_load_warnings(&mut human, session.load_report());
    if tasks.is_empty() {
        human.push_next_step("tasklink add <text>");
    }
    human
}

pub(crate) fn push_load_warnings(human: &mut HumanOutput, report: &LoadReport) {
    if let Some(reason) = &report.malformed {
        human.push_warning(format!("share link ignored: {reason}"));
    }
    for skipped in &report.skipped {
        human.push_warning(format!("skipped unreadable record {}: {}", skipped.key, skipped.reason));
    }
}

pub(crate) fn push_link(human: &mut HumanOutput, published: &Published) {
    human.push_summary("link", published.url.clone());
    if published.oversized {
        human.push_warning("share link is very long and may be truncated by some clients");
    }
}

/// Ids are 32 hex chars; eight are plenty to tell tasks apart on screen.
fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

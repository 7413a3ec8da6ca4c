//! tasklink theme commands

use crate::cli::task::push_load_warnings;
use crate::cli::Context;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::session::Session;
use crate::task::{Settings, Theme};

pub fn run_show(ctx: &Context) -> Result<()> {
    let mut session = ctx.open_session()?;
    session.close();
    emit_theme(ctx, "theme show", &session, session.settings())
}

pub fn run_set(ctx: &Context, raw: &str) -> Result<()> {
    let theme: Theme = raw.parse()?;
    let mut session = ctx.open_session()?;
    let settings = session.set_theme(theme)?;
    session.close();
    emit_theme(ctx, "theme set", &session, settings)
}

pub fn run_toggle(ctx: &Context) -> Result<()> {
    let mut session = ctx.open_session()?;
    let settings = session.toggle_theme()?;
    session.close();
    emit_theme(ctx, "theme toggle", &session, settings)
}

fn emit_theme(ctx: &Context, command: &str, session: &Session, settings: Settings) -> Result<()> {
    let mut human = HumanOutput::new(format!("tasklink theme: {}", settings.theme));
    push_load_warnings(&mut human, session.load_report());
    emit_success(ctx.output, command, &settings, Some(&human))
}

//! `bridgeward settle` - finish pending sandbox transitions

use anyhow::Result;

use super::Session;
use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let mut session = Session::sandbox(ctx)?;
    let settled = session.backend.settle();
    if settled == 0 {
        ui::info("No pending transitions");
        return Ok(());
    }

    session.save()?;
    ui::success(&format!("Settled {settled} transition(s)"));
    Ok(())
}

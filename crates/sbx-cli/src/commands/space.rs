//! space-info command implementation

use colored::Colorize;
use sbx_api::RequestContext;
use sbx_core::space::{self, SpaceInfo};

use super::{connect, require_space};
use crate::cli::GlobalArgs;
use crate::error::Result;

/// Run the space-info command
pub async fn run_space_info(globals: &GlobalArgs, space: Option<i64>, ctx: &RequestContext) -> Result<i32> {
    let (_, client) = connect(globals)?;
    let space = require_space(
        space.or(globals.target_space).or(globals.source_space),
        "TARGET_SPACE_ID",
    )?;

    let info = space::info(&client, ctx, space).await?;
    print_info(&info);
    Ok(0)
}

fn print_info(info: &SpaceInfo) {
    let options = &info.options;
    println!("{}", "Space".bold());
    println!();
    println!("{}:        {}", "ID".dimmed(), options.id);
    println!("{}:      {}", "Name".dimmed(), options.name.cyan());
    println!("{}:      {}", "Plan".dimmed(), options.plan_level);
    if !options.default_lang_name.is_empty() {
        println!("{}:  {}", "Language".dimmed(), options.default_lang_name);
    }
    if !options.languages.is_empty() {
        let codes: Vec<&str> = options.languages.iter().map(|lang| lang.code.as_str()).collect();
        println!("{}: {}", "Languages".dimmed(), codes.join(", "));
    }
    println!();

    let limits = &info.recommended;
    println!("{}:", "Recommended limits".bold());
    println!("  read:  {} req/s", limits.read_rps);
    println!("  write: {} req/s", limits.write_rps);
    println!("  burst: {}", limits.burst);
}

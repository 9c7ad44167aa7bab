use anyhow::Result;

mod cli;
mod runtime;
mod scenario;

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::parse()?;
    runtime::execute(args)
}
